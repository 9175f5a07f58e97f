//! Node paths and the store keys of Zarr V2 metadata and chunks.
//!
//! A node is an array or group in a Zarr hierarchy, identified by a [`NodePath`] such as `/` (the root) or `/group/array`.

use derive_more::Display;
use thiserror::Error;

use azarr_metadata::v2::{ARRAY_METADATA_KEY, ATTRIBUTES_KEY, GROUP_METADATA_KEY};
use azarr_storage::{StoreKey, StorePrefix};

/// A Zarr hierarchy node path.
///
/// The path starts with `/`, does not end with `/` (unless it is the root), and has no empty components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct NodePath(String);

/// An invalid node path.
#[derive(Debug, Clone, Error)]
#[error("invalid node path {0}")]
pub struct NodePathError(String);

impl NodePath {
    /// Create a new node path from `path`.
    ///
    /// A path without a leading `/` is interpreted relative to the root, so `array` and `/array` are equivalent.
    /// The empty string is the root.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if the path is invalid.
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        if Self::validate(&path) {
            Ok(Self(path))
        } else {
            Err(NodePathError(path))
        }
    }

    /// The root node path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Extracts a string slice of the underlying path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Validates a path.
    #[must_use]
    pub fn validate(path: &str) -> bool {
        path == "/"
            || (path.starts_with('/')
                && !path.ends_with('/')
                && path[1..].split('/').all(|component| {
                    !component.is_empty() && component != "." && component != ".."
                }))
    }

    /// Returns the store prefix of the node, e.g. `group/array/` for `/group/array` and the root prefix for `/`.
    #[must_use]
    pub fn to_prefix(&self) -> StorePrefix {
        if self.is_root() {
            StorePrefix::root()
        } else {
            // SAFETY: a valid non-root node path with the leading / stripped and a trailing / added is a valid prefix
            unsafe { StorePrefix::new_unchecked(self.0[1..].to_string() + "/") }
        }
    }
}

fn node_key(path: &NodePath, suffix: &str) -> StoreKey {
    // SAFETY: the prefix is empty or ends with /, and the suffix is a non-empty key without leading or trailing /
    unsafe { StoreKey::new_unchecked(path.to_prefix().as_str().to_string() + suffix) }
}

/// Return the Zarr V2 array metadata key (`.zarray`) of a node.
#[must_use]
pub fn meta_key_v2_array(path: &NodePath) -> StoreKey {
    node_key(path, ARRAY_METADATA_KEY)
}

/// Return the Zarr V2 group metadata key (`.zgroup`) of a node.
#[must_use]
pub fn meta_key_v2_group(path: &NodePath) -> StoreKey {
    node_key(path, GROUP_METADATA_KEY)
}

/// Return the Zarr V2 attributes key (`.zattrs`) of a node.
#[must_use]
pub fn meta_key_v2_attributes(path: &NodePath) -> StoreKey {
    node_key(path, ATTRIBUTES_KEY)
}

/// Return the data key of a chunk given the node path of the array and its encoded chunk key.
///
/// For example, the chunk key `2.0` of the array `/arr` has the data key `arr/2.0`.
#[must_use]
pub fn data_key(path: &NodePath, chunk_key: &StoreKey) -> StoreKey {
    node_key(path, chunk_key.as_str())
}
