//! The Zarr V2 chunk key encoding.
//!
//! The key of a chunk with at least one dimension is formed by concatenating for each dimension:
//! - the ASCII decimal string representation of the chunk index within that dimension, followed by
//! - the separator character, except that it is omitted for the last dimension.
//!
//! The key of the single chunk of a zero-dimensional array is `0`.

use itertools::Itertools;

pub use azarr_metadata::ChunkKeySeparator;
use azarr_storage::StoreKey;

/// A Zarr V2 chunk key encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkKeyEncoding {
    separator: ChunkKeySeparator,
}

impl ChunkKeyEncoding {
    /// Create a new chunk key encoding with separator `separator`.
    #[must_use]
    pub const fn new(separator: ChunkKeySeparator) -> Self {
        Self { separator }
    }

    /// Create a new chunk key encoding with separator `.`.
    #[must_use]
    pub const fn new_dot() -> Self {
        Self::new(ChunkKeySeparator::Dot)
    }

    /// Create a new chunk key encoding with separator `/`.
    #[must_use]
    pub const fn new_slash() -> Self {
        Self::new(ChunkKeySeparator::Slash)
    }

    /// Returns the separator.
    #[must_use]
    pub const fn separator(&self) -> ChunkKeySeparator {
        self.separator
    }

    /// Encode chunk grid indices into a chunk key, relative to the array prefix.
    #[must_use]
    pub fn encode(&self, chunk_grid_indices: &[u64]) -> StoreKey {
        let key = if chunk_grid_indices.is_empty() {
            '0'.to_string()
        } else {
            let mut separator_str: [u8; 4] = [0; 4];
            let separator_str: &str = self.separator.as_char().encode_utf8(&mut separator_str);

            let mut buffers = vec![itoa::Buffer::new(); chunk_grid_indices.len()];
            chunk_grid_indices
                .iter()
                .zip(&mut buffers)
                .map(|(&n, buffer)| buffer.format(n))
                .join(separator_str)
        };
        // SAFETY: a non-empty sequence of integers joined by a separator does not start or end with /
        unsafe { StoreKey::new_unchecked(key) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodePath, data_key};

    #[test]
    fn slash_nd() {
        let key = data_key(
            &NodePath::root(),
            &ChunkKeyEncoding::new_slash().encode(&[1, 23, 45]),
        );
        assert_eq!(key, StoreKey::new("1/23/45").unwrap());
    }

    #[test]
    fn dot_nd() {
        let key = data_key(
            &NodePath::new("arr").unwrap(),
            &ChunkKeyEncoding::new_dot().encode(&[2, 0]),
        );
        assert_eq!(key, StoreKey::new("arr/2.0").unwrap());
    }

    #[test]
    fn slash_scalar() {
        let key = ChunkKeyEncoding::new_slash().encode(&[]);
        assert_eq!(key, StoreKey::new("0").unwrap());
    }

    #[test]
    fn dot_scalar() {
        let key = data_key(
            &NodePath::new("/group/scalar").unwrap(),
            &ChunkKeyEncoding::default().encode(&[]),
        );
        assert_eq!(key, StoreKey::new("group/scalar/0").unwrap());
    }
}
