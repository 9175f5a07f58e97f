//! An asynchronous in-memory store.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::{
    AsyncListableStorageTraits, AsyncReadableStorageTraits, AsyncWritableStorageTraits, Bytes,
    MaybeBytes, StorageError, StoreKey, StoreKeys, StoreKeysPrefixes, StorePrefix,
};

/// An asynchronous in-memory store.
///
/// Operations never suspend, but the store is usable anywhere an asynchronous store is expected.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: Mutex<BTreeMap<StoreKey, Bytes>>,
}

impl MemoryStore {
    /// Create a new memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data_map.lock().len()
    }

    /// Returns true if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_map.lock().is_empty()
    }
}

#[async_trait::async_trait]
impl AsyncReadableStorageTraits for MemoryStore {
    async fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        Ok(self.data_map.lock().get(key).cloned())
    }

    async fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        Ok(self
            .data_map
            .lock()
            .get(key)
            .map(|value| value.len() as u64))
    }
}

#[async_trait::async_trait]
impl AsyncWritableStorageTraits for MemoryStore {
    async fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        self.data_map.lock().insert(key.clone(), value);
        Ok(())
    }

    async fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        self.data_map.lock().remove(key);
        Ok(())
    }

    async fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        self.data_map.lock().retain(|key, _| !key.has_prefix(prefix));
        Ok(())
    }
}

#[async_trait::async_trait]
impl AsyncListableStorageTraits for MemoryStore {
    async fn list(&self) -> Result<StoreKeys, StorageError> {
        Ok(self.data_map.lock().keys().cloned().collect())
    }

    async fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        Ok(self
            .data_map
            .lock()
            .keys()
            .filter(|&key| key.has_prefix(prefix))
            .cloned()
            .collect())
    }

    async fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let keys = self.list_prefix(prefix).await?;
        StoreKeysPrefixes::from_keys(keys.iter(), prefix)
    }

    async fn size_prefix(&self, prefix: &StorePrefix) -> Result<u64, StorageError> {
        Ok(self
            .data_map
            .lock()
            .iter()
            .filter(|(key, _)| key.has_prefix(prefix))
            .map(|(_, value)| value.len() as u64)
            .sum())
    }
}
