#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use azarr::storage::{
    AsyncReadableStorageTraits, AsyncWritableStorageTraits, Bytes, MaybeBytes, StorageError,
    StoreKey, StorePrefix,
};

/// A store adapter that suspends every read a pseudo-random number of times, so concurrent reads complete out of order.
#[derive(Debug)]
pub(crate) struct ShuffledReadsStorageAdapter<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    state: AtomicU64,
}

impl<TStorage: ?Sized> ShuffledReadsStorageAdapter<TStorage> {
    pub(crate) fn new(storage: Arc<TStorage>, seed: u64) -> Self {
        Self {
            storage,
            state: AtomicU64::new(seed),
        }
    }

    fn next_delay(&self) -> u64 {
        // Knuth's MMIX linear congruential generator
        let state = self
            .state
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) % 16
    }
}

#[async_trait::async_trait]
impl<TStorage: ?Sized + AsyncReadableStorageTraits> AsyncReadableStorageTraits
    for ShuffledReadsStorageAdapter<TStorage>
{
    async fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        for _ in 0..self.next_delay() {
            tokio::task::yield_now().await;
        }
        self.storage.get(key).await
    }

    async fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        self.storage.size_key(key).await
    }
}

#[async_trait::async_trait]
impl<TStorage: ?Sized + AsyncWritableStorageTraits> AsyncWritableStorageTraits
    for ShuffledReadsStorageAdapter<TStorage>
{
    async fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        self.storage.set(key, value).await
    }

    async fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        self.storage.erase(key).await
    }

    async fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        self.storage.erase_prefix(prefix).await
    }
}

/// A store adapter whose reads of one key fail with a storage error.
#[derive(Debug)]
pub(crate) struct FailingReadsStorageAdapter<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    failing_key: StoreKey,
}

impl<TStorage: ?Sized> FailingReadsStorageAdapter<TStorage> {
    pub(crate) fn new(storage: Arc<TStorage>, failing_key: StoreKey) -> Self {
        Self {
            storage,
            failing_key,
        }
    }
}

#[async_trait::async_trait]
impl<TStorage: ?Sized + AsyncReadableStorageTraits> AsyncReadableStorageTraits
    for FailingReadsStorageAdapter<TStorage>
{
    async fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        if key == &self.failing_key {
            return Err(StorageError::Other(format!("connection reset reading {key}")));
        }
        self.storage.get(key).await
    }

    async fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        self.storage.size_key(key).await
    }
}

#[async_trait::async_trait]
impl<TStorage: ?Sized + AsyncWritableStorageTraits> AsyncWritableStorageTraits
    for FailingReadsStorageAdapter<TStorage>
{
    async fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        self.storage.set(key, value).await
    }

    async fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        self.storage.erase(key).await
    }

    async fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        self.storage.erase_prefix(prefix).await
    }
}
