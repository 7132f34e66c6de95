//! Utilities for validating constraints on types.

use validator::{Validate, ValidationErrors};

/// A type that cannot be instatiated without validating the value within.
/// That is, if you have a [`Valid<T>`], `T` is guaranteed to be valid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Valid<T> {
    value: T,
}

impl<T> Valid<T> {
    /// Constructs a new validated value.
    pub fn new(value: T) -> Result<Valid<T>, ValidationErrors>
    where
        T: Validate,
    {
        value.validate().map(|_| Valid { value })
    }

    /// Returns a reference to the validated value.
    pub fn inner(&self) -> &T {
        &self.value
    }

    /// Returns the validated value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> AsRef<T> for Valid<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::Valid;
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct Fields {
        #[validate(length(min = 1))]
        title: String,
        #[validate(length(min = 1))]
        description: Option<String>,
    }

    #[test]
    pub fn valid_value_succeeds() {
        let value = Valid::new(Fields {
            title: "Mug".to_string(),
            description: None,
        });
        assert_eq!("Mug", value.unwrap().inner().title);
    }

    #[test]
    pub fn invalid_value_fails() {
        let value = Valid::new(Fields {
            title: String::new(),
            description: Some("Blue ceramic mug".to_string()),
        });
        let errors = value.unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    pub fn optional_fields_are_checked_when_present() {
        let value = Valid::new(Fields {
            title: "Mug".to_string(),
            description: Some(String::new()),
        });
        assert!(value.is_err());
    }
}
