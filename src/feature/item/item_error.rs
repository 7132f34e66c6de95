//! Errors from item operations.

use crate::feature::asset::asset_store::AssetError;

/// Why an item operation failed.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    /// The input breaks a constraint, such as an empty title.
    #[error("{0}")]
    Validation(String),
    /// No item has the given id.
    #[error("Item not found")]
    NotFound,
    /// The image could not be stored.
    #[error(transparent)]
    AssetWrite(#[from] AssetError),
    /// The database failed.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// The result of item operations.
pub type ItemResult<T> = Result<T, ItemError>;

impl From<validator::ValidationErrors> for ItemError {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut invalid_fields = Vec::new();
        for (field, errors) in e.field_errors() {
            let reasons: Vec<String> = errors
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            invalid_fields.push(format!("{field} ({})", reasons.join(", ")));
        }
        invalid_fields.sort();
        ItemError::Validation(format!("invalid field(s): {}", invalid_fields.join(", ")))
    }
}
