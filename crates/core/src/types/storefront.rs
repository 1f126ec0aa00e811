//! Storefront name type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`StorefrontName`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum StorefrontNameError {
    /// The input string is empty.
    #[error("storefront name cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("storefront name must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[A-Za-z0-9_-]`.
    #[error("storefront name contains invalid character: {0:?}")]
    InvalidCharacter(char),
}

const MAX_STOREFRONT_NAME_LENGTH: usize = 64;

/// The name of a storefront partition (e.g. `LUNERA`, `HEALTH`).
///
/// Storefront names double as partition prefixes in the catalog store, so
/// they are restricted to characters that are safe in document paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorefrontName(String);

impl StorefrontName {
    /// Parse and validate a storefront name.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontNameError`] if the name is empty, too long, or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn parse(name: impl Into<String>) -> Result<Self, StorefrontNameError> {
        let name = name.into();

        if name.is_empty() {
            return Err(StorefrontNameError::Empty);
        }
        if name.len() > MAX_STOREFRONT_NAME_LENGTH {
            return Err(StorefrontNameError::TooLong {
                max: MAX_STOREFRONT_NAME_LENGTH,
            });
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(StorefrontNameError::InvalidCharacter(bad));
        }

        Ok(Self(name))
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorefrontName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StorefrontName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(StorefrontName::parse("LUNERA").is_ok());
        assert!(StorefrontName::parse("HEALTH").is_ok());
        assert!(StorefrontName::parse("pop-up_2").is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            StorefrontName::parse(""),
            Err(StorefrontNameError::Empty)
        ));
    }

    #[test]
    fn test_invalid_character_rejected() {
        assert!(matches!(
            StorefrontName::parse("shop/items"),
            Err(StorefrontNameError::InvalidCharacter('/'))
        ));
    }

    #[test]
    fn test_too_long_rejected() {
        let name = "x".repeat(65);
        assert!(matches!(
            StorefrontName::parse(name),
            Err(StorefrontNameError::TooLong { max: 64 })
        ));
    }

    #[test]
    fn test_serde_is_transparent() {
        let name = StorefrontName::parse("LUNERA").expect("valid");
        let json = serde_json::to_string(&name).expect("serialize");
        assert_eq!(json, "\"LUNERA\"");
    }
}
