use derive_more::Display;
use thiserror::Error;

/// A store prefix.
///
/// A prefix is either the root prefix (an empty string) or a string ending with `/`, such as `group/array/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct StorePrefix(String);

/// An invalid store prefix.
#[derive(Debug, Clone, Error)]
#[error("invalid store prefix {0}")]
pub struct StorePrefixError(String);

/// A list of [`StorePrefix`].
pub type StorePrefixes = Vec<StorePrefix>;

impl StorePrefix {
    /// The root prefix.
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Create a new store prefix from `prefix`.
    ///
    /// # Errors
    /// Returns [`StorePrefixError`] if `prefix` is not valid according to [`StorePrefix::validate()`].
    pub fn new(prefix: impl Into<String>) -> Result<Self, StorePrefixError> {
        let prefix: String = prefix.into();
        if Self::validate(&prefix) {
            Ok(Self(prefix))
        } else {
            Err(StorePrefixError(prefix))
        }
    }

    /// Create a new store prefix from `prefix` without validation.
    ///
    /// # Safety
    /// `prefix` is not validated, so this can result in an invalid store prefix.
    #[must_use]
    pub unsafe fn new_unchecked(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        debug_assert!(Self::validate(&prefix));
        Self(prefix)
    }

    /// Extracts a string slice of the underlying prefix [String].
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Validates a prefix.
    ///
    /// A prefix must be empty or end with a `/` which is not also its first character.
    #[must_use]
    pub fn validate(prefix: &str) -> bool {
        prefix.is_empty() || (prefix.ends_with('/') && !prefix.starts_with('/'))
    }
}

impl TryFrom<&str> for StorePrefix {
    type Error = StorePrefixError;

    fn try_from(prefix: &str) -> Result<Self, Self::Error> {
        Self::new(prefix)
    }
}
