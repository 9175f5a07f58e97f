use derive_more::Display;
use thiserror::Error;

use crate::StorePrefix;

/// A store key.
///
/// A key is a `/` separated string that identifies a single value in a store, such as `group/array/.zarray` or `array/0.0`.
/// It does not start or end with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct StoreKey(String);

/// An invalid store key.
#[derive(Debug, Clone, Error)]
#[error("invalid store key {0}")]
pub struct StoreKeyError(String);

impl From<&str> for StoreKeyError {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// A list of [`StoreKey`].
pub type StoreKeys = Vec<StoreKey>;

impl StoreKey {
    /// Create a new store key from `key`.
    ///
    /// # Errors
    /// Returns [`StoreKeyError`] if `key` is not valid according to [`StoreKey::validate()`].
    pub fn new(key: impl Into<String>) -> Result<Self, StoreKeyError> {
        let key: String = key.into();
        if Self::validate(&key) {
            Ok(Self(key))
        } else {
            Err(StoreKeyError(key))
        }
    }

    /// Create a new store key from `key` without validation.
    ///
    /// # Safety
    /// `key` is not validated, so this can result in an invalid store key.
    #[must_use]
    pub unsafe fn new_unchecked(key: impl Into<String>) -> Self {
        let key = key.into();
        debug_assert!(Self::validate(&key));
        Self(key)
    }

    /// Extracts a string slice of the underlying key [String].
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Validates a key.
    ///
    /// A key must be non-empty and must not start or end with `/`.
    #[must_use]
    pub fn validate(key: &str) -> bool {
        !key.is_empty() && !key.starts_with('/') && !key.ends_with('/')
    }

    /// Returns true if the key has prefix `prefix`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &StorePrefix) -> bool {
        self.0.starts_with(prefix.as_str())
    }

    /// Returns the name of the key, which is the last component of its path.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit_once('/').map_or(self.0.as_str(), |(_, name)| name)
    }

    /// Returns the parent of this key.
    #[must_use]
    pub fn parent(&self) -> StorePrefix {
        let parent = self
            .0
            .rsplit_once('/')
            .map_or_else(String::new, |(parent, _)| parent.to_string() + "/");
        // SAFETY: the parent is empty or ends with a single /
        unsafe { StorePrefix::new_unchecked(parent) }
    }
}

impl TryFrom<&str> for StoreKey {
    type Error = StoreKeyError;

    fn try_from(key: &str) -> Result<Self, Self::Error> {
        Self::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_key() {
        assert!(StoreKey::new("a").is_ok());
        assert!(StoreKey::new("a/b/.zarray").is_ok());
        assert!(StoreKey::new("").is_err());
        assert!(StoreKey::new("/a").is_err());
        assert!(StoreKey::new("a/").is_err());
    }

    #[test]
    fn store_key_parent() {
        let key = StoreKey::new("a/b/0.0").unwrap();
        assert_eq!(key.parent(), StorePrefix::new("a/b/").unwrap());
        assert_eq!(key.name(), "0.0");
        let key = StoreKey::new(".zmetadata").unwrap();
        assert_eq!(key.parent(), StorePrefix::root());
        assert!(key.has_prefix(&StorePrefix::root()));
    }
}
