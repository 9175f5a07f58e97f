/// Options for array operations.
#[derive(Debug, Clone, Default)]
pub struct ArrayOptions {
    concurrent_limit: Option<usize>,
    store_empty_chunks: bool,
    read_only: bool,
}

impl ArrayOptions {
    /// Return the concurrent limit: the maximum number of chunks fetched or stored at once.
    ///
    /// [`None`] (the default) places no limit beyond the number of chunks in a selection.
    #[must_use]
    pub fn concurrent_limit(&self) -> Option<usize> {
        self.concurrent_limit
    }

    /// Set the concurrent limit.
    pub fn set_concurrent_limit(&mut self, concurrent_limit: Option<usize>) -> &mut Self {
        self.concurrent_limit = concurrent_limit;
        self
    }

    /// Set the concurrent limit.
    #[must_use]
    pub fn with_concurrent_limit(mut self, concurrent_limit: Option<usize>) -> Self {
        self.concurrent_limit = concurrent_limit;
        self
    }

    /// Return the store empty chunks setting.
    ///
    /// If false (the default), chunks written with every element equal to the fill value are erased rather than stored.
    #[must_use]
    pub fn store_empty_chunks(&self) -> bool {
        self.store_empty_chunks
    }

    /// Set whether or not to store empty chunks.
    pub fn set_store_empty_chunks(&mut self, store_empty_chunks: bool) -> &mut Self {
        self.store_empty_chunks = store_empty_chunks;
        self
    }

    /// Set whether or not to store empty chunks.
    #[must_use]
    pub fn with_store_empty_chunks(mut self, store_empty_chunks: bool) -> Self {
        self.store_empty_chunks = store_empty_chunks;
        self
    }

    /// Return the read only setting.
    ///
    /// If true, operations that write to the store fail with [`StorageError::ReadOnly`](azarr_storage::StorageError::ReadOnly).
    #[must_use]
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Set whether or not the array is read only.
    pub fn set_read_only(&mut self, read_only: bool) -> &mut Self {
        self.read_only = read_only;
        self
    }

    /// Set whether or not the array is read only.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}
