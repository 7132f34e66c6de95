//! The content store abstraction for uploaded images.
//!
//! Everything outside this module treats an [`AssetRef`] as an opaque token:
//! only an [`AssetStore`] knows how a reference maps to stored bytes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to a stored asset, e.g. `/uploads/1700000000000-3f2a.jpg`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    /// Wraps a reference previously returned by an [`AssetStore`].
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// The reference as stored on an item.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An uploaded file, fully received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    /// The file name the client sent, possibly empty.
    pub file_name: String,
    /// The content type the client claimed.
    pub content_type: Option<String>,
    /// The file contents.
    pub data: Bytes,
}

/// Errors from storing or removing assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// Reading or writing the content store failed.
    #[error("failed to write asset: {0}")]
    Io(#[from] std::io::Error),
    /// The upload could not be decoded or re-encoded as an image.
    #[error("could not process image: {0}")]
    Transform(#[from] image::ImageError),
    /// The upload is not a kind of image the store accepts.
    #[error("unsupported file type: {0:?}")]
    Unsupported(String),
    /// The blocking transform task died.
    #[error("image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Anything that can hold uploaded assets.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AssetStore: Send + Sync {
    /// Persists an upload under a fresh unique name.
    ///
    /// On failure nothing is left behind in the store.
    async fn store(&self, upload: Upload) -> Result<AssetRef, AssetError>;

    /// Deletes an asset. Deleting an absent asset succeeds.
    async fn remove(&self, asset: &AssetRef) -> Result<(), AssetError>;

    /// Whether the asset is currently stored.
    async fn exists(&self, asset: &AssetRef) -> bool;
}
