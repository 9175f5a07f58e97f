//! The asynchronous storage API for the `azarr` crate.
//!
//! A store is a key-value system holding the metadata documents and chunks of a Zarr V2 hierarchy.
//! For example: an in-memory map, a filesystem, an HTTP server or an object store bucket.
//! Every operation is asynchronous, so many chunk requests can be in flight on a single task without a thread per request.
//!
//! A missing key is not an error: reads return [`MaybeBytes`], which is [`None`] if the key does not exist.
//!
//! This crate includes an in-memory store ([`store::MemoryStore`]) and a metrics adapter ([`storage_adapter::performance_metrics`]).
//!
//! ## Licence
//! `azarr_storage` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod storage_adapter;
mod storage_async;
pub mod store;
mod store_key;
mod store_prefix;


use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

pub use self::storage_async::{
    AsyncListableStorageTraits, AsyncReadableListableStorageTraits,
    AsyncReadableStorageTraits, AsyncReadableWritableListableStorageTraits,
    AsyncReadableWritableStorageTraits, AsyncWritableStorageTraits,
};

/// [`Arc`] wrapped asynchronous readable storage.
pub type AsyncReadableStorage = Arc<dyn AsyncReadableStorageTraits>;

/// [`Arc`] wrapped asynchronous writable storage.
pub type AsyncWritableStorage = Arc<dyn AsyncWritableStorageTraits>;

/// [`Arc`] wrapped asynchronous readable and writable storage.
pub type AsyncReadableWritableStorage = Arc<dyn AsyncReadableWritableStorageTraits>;

/// [`Arc`] wrapped asynchronous listable storage.
pub type AsyncListableStorage = Arc<dyn AsyncListableStorageTraits>;

/// [`Arc`] wrapped asynchronous readable and listable storage.
pub type AsyncReadableListableStorage = Arc<dyn AsyncReadableListableStorageTraits>;

/// [`Arc`] wrapped asynchronous readable, writable and listable storage.
pub type AsyncReadableWritableListableStorage = Arc<dyn AsyncReadableWritableListableStorageTraits>;

/// The type for bytes used in store set and get methods.
///
/// An alias for [`bytes::Bytes`].
pub type Bytes = bytes::Bytes;

/// An alias for bytes which may or may not be available.
///
/// When a value is read from a store, it returns `MaybeBytes` which is [`None`] if the key is not available.
/// A missing chunk is substituted with the fill value of the array (if any) by the reader.
pub type MaybeBytes = Option<Bytes>;

/// A [`StoreKey`] and [`Bytes`] pair, as used by [`AsyncWritableStorageTraits::set_many`].
pub type StoreKeyValue = (StoreKey, Bytes);

/// [`StoreKeys`] and [`StorePrefixes`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StoreKeysPrefixes {
    keys: StoreKeys,
    prefixes: StorePrefixes,
}

impl StoreKeysPrefixes {
    /// Create a new [`StoreKeysPrefixes`].
    #[must_use]
    pub fn new(keys: StoreKeys, prefixes: StorePrefixes) -> Self {
        Self { keys, prefixes }
    }

    /// Split `keys` into the direct children of `prefix` and the child prefixes one level below it.
    ///
    /// Keys without prefix `prefix` are ignored.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if a child prefix is invalid.
    pub fn from_keys<'a>(
        keys: impl Iterator<Item = &'a StoreKey>,
        prefix: &StorePrefix,
    ) -> Result<Self, StorageError> {
        let mut children: StoreKeys = vec![];
        let mut prefixes: BTreeSet<StorePrefix> = BTreeSet::default();
        for key in keys {
            let Some(key_strip) = key.as_str().strip_prefix(prefix.as_str()) else {
                continue;
            };
            if let Some((component, _)) = key_strip.split_once('/') {
                prefixes.insert(StorePrefix::new(
                    prefix.as_str().to_string() + component + "/",
                )?);
            } else {
                children.push(key.clone());
            }
        }
        Ok(Self::new(children, prefixes.into_iter().collect()))
    }

    /// Returns the keys.
    #[must_use]
    pub const fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Returns the prefixes.
    #[must_use]
    pub const fn prefixes(&self) -> &StorePrefixes {
        &self.prefixes
    }
}

/// A storage error.
///
/// A key that does not exist is not a storage error.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] Arc<std::io::Error>),
    /// An error parsing the metadata for a key.
    #[error("error parsing metadata for {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// An invalid store prefix.
    #[error(transparent)]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid store key.
    #[error(transparent)]
    InvalidStoreKey(#[from] StoreKeyError),
    /// The requested method is not supported.
    #[error("{0}")]
    Unsupported(String),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
