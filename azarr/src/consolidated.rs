//! Consolidated metadata.
//!
//! A consolidated metadata document (`.zmetadata`) holds the metadata of every node in a hierarchy, so a reader can discover the hierarchy with a single store request.
//! A [`ConsolidatedMetadataStore`] loads that document once and serves metadata reads from it without further store access.
//! Writes pass through to the underlying store and are not reflected in the loaded metadata.
//!
//! [`open_consolidated`] opens an array whose metadata comes from the consolidated document and whose chunks come from the store.
//!
//! ```rust
//! # use std::sync::Arc;
//! # use azarr::consolidated::open_consolidated;
//! # use azarr::indexer::Selection;
//! # use azarr_storage::{AsyncWritableStorageTraits, StoreKey, store::MemoryStore};
//! # futures::executor::block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! store.set(
//!     &StoreKey::new(".zmetadata")?,
//!     r#"{
//!         "zarr_consolidated_format": 1,
//!         "metadata": {
//!             "temperature/.zarray": {
//!                 "zarr_format": 2, "shape": [4], "chunks": [2], "dtype": "<f4",
//!                 "compressor": null, "fill_value": 0.5, "order": "C", "filters": null
//!             }
//!         }
//!     }"#.into(),
//! ).await?;
//!
//! let array = open_consolidated(store, "temperature").await?;
//! let values = array.async_get(&Selection::all()).await?;
//! assert_eq!(values.to_elements::<f32>()?, vec![0.5; 4]);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

use std::str::FromStr;
use std::sync::Arc;

use async_lock::OnceCell;
use log::debug;
use thiserror::Error;

use azarr_metadata::v2::{ConsolidatedMetadataV2, DEFAULT_CONSOLIDATED_METADATA_KEY};
use azarr_storage::{
    AsyncListableStorageTraits, AsyncReadableStorageTraits, AsyncWritableStorageTraits, Bytes,
    MaybeBytes, StorageError, StoreKey, StoreKeys, StoreKeysPrefixes, StorePrefix,
};

use crate::array::{
    Array, ArrayCreateError, ArrayErrorKind, ArrayOptions, CodecRegistry,
    async_retrieve_metadata,
};
use crate::node::NodePath;

/// The consolidated metadata of a hierarchy: a mapping from store key to the JSON value stored at that key.
pub type ConsolidatedMetadata = serde_json::Map<String, serde_json::Value>;

/// A consolidated metadata error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ConsolidatedMetadataError {
    /// The consolidated metadata document does not exist.
    #[error("consolidated metadata is missing at {0}")]
    Missing(StoreKey),
    /// The consolidated metadata document is not valid JSON or has the wrong structure.
    #[error("invalid consolidated metadata at {0}: {1}")]
    InvalidFormat(StoreKey, String),
    /// The consolidated metadata format version is not supported.
    #[error("unsupported consolidated metadata format {1} at {0}, expected {expected}", expected = ConsolidatedMetadataV2::SUPPORTED_FORMAT)]
    UnsupportedFormat(StoreKey, u64),
    /// The consolidated metadata has not been loaded.
    #[error("consolidated metadata has not been loaded")]
    Uninitialized,
    /// An invalid open mode.
    #[error("invalid open mode {0:?}, expected \"r\" or \"r+\"")]
    InvalidMode(String),
    /// A store error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An array could not be opened.
    #[error(transparent)]
    ArrayCreateError(#[from] ArrayCreateError),
}

impl ConsolidatedMetadataError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ArrayErrorKind {
        match self {
            Self::Missing(_) => ArrayErrorKind::NotFound,
            Self::InvalidFormat(..) | Self::UnsupportedFormat(..) => ArrayErrorKind::Format,
            Self::Uninitialized | Self::InvalidMode(_) => ArrayErrorKind::Unsupported,
            Self::StorageError(_) => ArrayErrorKind::Storage,
            Self::ArrayCreateError(err) => err.kind(),
        }
    }
}

impl From<ConsolidatedMetadataError> for StorageError {
    fn from(err: ConsolidatedMetadataError) -> Self {
        match err {
            ConsolidatedMetadataError::StorageError(err) => err,
            ConsolidatedMetadataError::InvalidFormat(key, message) => {
                Self::InvalidMetadata(key, message)
            }
            err => Self::Other(err.to_string()),
        }
    }
}

/// The load state of a [`ConsolidatedMetadataStore`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConsolidatedMetadataState {
    /// The consolidated metadata has not been requested.
    Uninitialized,
    /// The consolidated metadata is loaded.
    Loaded,
    /// Loading the consolidated metadata failed. This state is terminal.
    Failed,
}

/// A store overlay that serves metadata from a consolidated metadata document.
///
/// The document is fetched once, on the first read (or [`initialize`](ConsolidatedMetadataStore::initialize)).
/// Concurrent first readers share the same fetch.
/// The outcome of the fetch is terminal: a failed load is not retried.
///
/// Once loaded, reads and listings are served from the document without store access.
/// Keys that are not in the document do not exist.
/// Writes and erasures pass through to the underlying store unmodified and do not update the loaded document.
#[derive(Debug)]
pub struct ConsolidatedMetadataStore<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    metadata_key: StoreKey,
    metadata: OnceCell<Result<ConsolidatedMetadata, ConsolidatedMetadataError>>,
}

impl<TStorage: ?Sized> ConsolidatedMetadataStore<TStorage> {
    /// Create a new consolidated metadata store over `storage`, with the document at `.zmetadata`.
    #[must_use]
    pub fn new(storage: Arc<TStorage>) -> Self {
        // SAFETY: the default consolidated metadata key is a valid key
        let metadata_key =
            unsafe { StoreKey::new_unchecked(DEFAULT_CONSOLIDATED_METADATA_KEY.to_string()) };
        Self::new_with_key(storage, metadata_key)
    }

    /// Create a new consolidated metadata store over `storage`, with the document at `metadata_key`.
    #[must_use]
    pub fn new_with_key(storage: Arc<TStorage>, metadata_key: StoreKey) -> Self {
        Self {
            storage,
            metadata_key,
            metadata: OnceCell::new(),
        }
    }

    /// The key of the consolidated metadata document.
    #[must_use]
    pub const fn metadata_key(&self) -> &StoreKey {
        &self.metadata_key
    }

    /// The underlying store.
    #[must_use]
    pub fn storage(&self) -> Arc<TStorage> {
        self.storage.clone()
    }

    /// The load state.
    #[must_use]
    pub fn state(&self) -> ConsolidatedMetadataState {
        match self.metadata.get() {
            None => ConsolidatedMetadataState::Uninitialized,
            Some(Ok(_)) => ConsolidatedMetadataState::Loaded,
            Some(Err(_)) => ConsolidatedMetadataState::Failed,
        }
    }

    /// Retrieve the value at `key` from the loaded metadata without waiting.
    ///
    /// Returns [`None`] if `key` is not in the consolidated metadata.
    ///
    /// # Errors
    /// Returns [`ConsolidatedMetadataError::Uninitialized`] if the metadata has not finished loading, or the load error if it failed.
    pub fn get_loaded(&self, key: &StoreKey) -> Result<MaybeBytes, ConsolidatedMetadataError> {
        match self.metadata.get() {
            None => Err(ConsolidatedMetadataError::Uninitialized),
            Some(metadata) => lookup(metadata.as_ref().map_err(Clone::clone)?, key),
        }
    }
}

fn lookup(
    metadata: &ConsolidatedMetadata,
    key: &StoreKey,
) -> Result<MaybeBytes, ConsolidatedMetadataError> {
    metadata
        .get(key.as_str())
        .map(|value| {
            serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|err| ConsolidatedMetadataError::InvalidFormat(key.clone(), err.to_string()))
        })
        .transpose()
}

impl<TStorage: ?Sized + AsyncReadableStorageTraits> ConsolidatedMetadataStore<TStorage> {
    /// Load the consolidated metadata if it has not been loaded.
    ///
    /// # Errors
    /// Returns [`ConsolidatedMetadataError`] if the document is missing, invalid, has an unsupported format, or the store fails.
    pub async fn initialize(&self) -> Result<(), ConsolidatedMetadataError> {
        self.metadata().await.map(|_| ())
    }

    /// Return the consolidated metadata, loading it if it has not been loaded.
    ///
    /// # Errors
    /// See [`initialize`](ConsolidatedMetadataStore::initialize).
    pub async fn metadata(&self) -> Result<&ConsolidatedMetadata, ConsolidatedMetadataError> {
        self.metadata
            .get_or_init(|| self.fetch())
            .await
            .as_ref()
            .map_err(Clone::clone)
    }

    async fn fetch(&self) -> Result<ConsolidatedMetadata, ConsolidatedMetadataError> {
        let key = &self.metadata_key;
        debug!("loading consolidated metadata from {key}");
        let Some(bytes) = self.storage.get(key).await? else {
            return Err(ConsolidatedMetadataError::Missing(key.clone()));
        };
        let consolidated: ConsolidatedMetadataV2 = serde_json::from_slice(&bytes)
            .map_err(|err| ConsolidatedMetadataError::InvalidFormat(key.clone(), err.to_string()))?;
        if !consolidated.is_supported_format() {
            return Err(ConsolidatedMetadataError::UnsupportedFormat(
                key.clone(),
                consolidated.zarr_consolidated_format,
            ));
        }
        debug!(
            "loaded consolidated metadata from {key} with {} entries",
            consolidated.metadata.len()
        );
        Ok(consolidated.metadata)
    }

    async fn keys(&self) -> Result<StoreKeys, StorageError> {
        let mut keys = self
            .metadata()
            .await?
            .keys()
            .map(StoreKey::new)
            .collect::<Result<StoreKeys, _>>()?;
        keys.sort();
        Ok(keys)
    }
}

#[async_trait::async_trait]
impl<TStorage: ?Sized + AsyncReadableStorageTraits> AsyncReadableStorageTraits
    for ConsolidatedMetadataStore<TStorage>
{
    async fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        Ok(lookup(self.metadata().await?, key)?)
    }

    async fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        Ok(self.get(key).await?.map(|bytes| bytes.len() as u64))
    }
}

#[async_trait::async_trait]
impl<TStorage: ?Sized + AsyncReadableStorageTraits> AsyncListableStorageTraits
    for ConsolidatedMetadataStore<TStorage>
{
    async fn list(&self) -> Result<StoreKeys, StorageError> {
        self.keys().await
    }

    async fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let mut keys = self.keys().await?;
        keys.retain(|key| key.has_prefix(prefix));
        Ok(keys)
    }

    async fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let keys = self.list_prefix(prefix).await?;
        StoreKeysPrefixes::from_keys(keys.iter(), prefix)
    }

    async fn size_prefix(&self, prefix: &StorePrefix) -> Result<u64, StorageError> {
        let mut size = 0;
        for key in self.list_prefix(prefix).await? {
            size += self.size_key(&key).await?.unwrap_or_default();
        }
        Ok(size)
    }
}

#[async_trait::async_trait]
impl<TStorage: ?Sized + AsyncWritableStorageTraits> AsyncWritableStorageTraits
    for ConsolidatedMetadataStore<TStorage>
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

/// The mode of an array opened from consolidated metadata.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Read only (`r`).
    #[default]
    Read,
    /// Read and write existing chunks (`r+`).
    ReadWrite,
}

impl FromStr for OpenMode {
    type Err = ConsolidatedMetadataError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "r" => Ok(Self::Read),
            "r+" => Ok(Self::ReadWrite),
            mode => Err(ConsolidatedMetadataError::InvalidMode(mode.to_string())),
        }
    }
}

/// Options for [`open_consolidated_opt`].
#[derive(Debug)]
pub struct OpenConsolidatedOptions<TStorage: ?Sized> {
    metadata_key: StoreKey,
    mode: OpenMode,
    chunk_store: Option<Arc<TStorage>>,
    codec_registry: CodecRegistry,
}

impl<TStorage: ?Sized> Default for OpenConsolidatedOptions<TStorage> {
    fn default() -> Self {
        // SAFETY: the default consolidated metadata key is a valid key
        let metadata_key =
            unsafe { StoreKey::new_unchecked(DEFAULT_CONSOLIDATED_METADATA_KEY.to_string()) };
        Self {
            metadata_key,
            mode: OpenMode::default(),
            chunk_store: None,
            codec_registry: CodecRegistry::default(),
        }
    }
}

impl<TStorage: ?Sized> OpenConsolidatedOptions<TStorage> {
    /// Set the key of the consolidated metadata document. Defaults to `.zmetadata`.
    #[must_use]
    pub fn with_metadata_key(mut self, metadata_key: StoreKey) -> Self {
        self.metadata_key = metadata_key;
        self
    }

    /// Set the open mode. Defaults to [`OpenMode::Read`].
    #[must_use]
    pub fn with_mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set a separate store for chunks. Defaults to the store holding the consolidated metadata.
    #[must_use]
    pub fn with_chunk_store(mut self, chunk_store: Arc<TStorage>) -> Self {
        self.chunk_store = Some(chunk_store);
        self
    }

    /// Set the codec registry.
    #[must_use]
    pub fn with_codec_registry(mut self, codec_registry: CodecRegistry) -> Self {
        self.codec_registry = codec_registry;
        self
    }

    /// The key of the consolidated metadata document.
    #[must_use]
    pub const fn metadata_key(&self) -> &StoreKey {
        &self.metadata_key
    }

    /// The open mode.
    #[must_use]
    pub const fn mode(&self) -> OpenMode {
        self.mode
    }
}

/// Open the array at `path` of a hierarchy with consolidated metadata at `.zmetadata` in `storage`.
///
/// # Errors
/// Returns [`ConsolidatedMetadataError`] if the consolidated metadata cannot be loaded or the array metadata is missing or invalid.
pub async fn open_consolidated<TStorage: ?Sized + AsyncReadableStorageTraits>(
    storage: Arc<TStorage>,
    path: &str,
) -> Result<Array<TStorage>, ConsolidatedMetadataError> {
    open_consolidated_opt(storage, path, OpenConsolidatedOptions::default()).await
}

/// Open the array at `path` of a hierarchy with consolidated metadata in `storage`, with `options`.
///
/// The array metadata is read from the consolidated metadata with a single store request.
/// Chunks are read from the chunk store of `options`, or `storage` if none is set.
/// An array opened with [`OpenMode::Read`] rejects writes.
///
/// # Errors
/// Returns [`ConsolidatedMetadataError`] if the consolidated metadata cannot be loaded or the array metadata is missing or invalid.
pub async fn open_consolidated_opt<TStorage: ?Sized + AsyncReadableStorageTraits>(
    storage: Arc<TStorage>,
    path: &str,
    options: OpenConsolidatedOptions<TStorage>,
) -> Result<Array<TStorage>, ConsolidatedMetadataError> {
    let node_path = NodePath::new(path).map_err(ArrayCreateError::from)?;
    let metadata_store =
        ConsolidatedMetadataStore::new_with_key(storage.clone(), options.metadata_key);
    metadata_store.initialize().await?;
    let metadata = async_retrieve_metadata(&metadata_store, &node_path).await?;
    let chunk_store = options.chunk_store.unwrap_or(storage);
    let array =
        Array::new_with_metadata_opt(chunk_store, path, metadata, &options.codec_registry)?;
    let read_only = options.mode == OpenMode::Read;
    Ok(array.with_options(ArrayOptions::default().with_read_only(read_only)))
}

impl<TStorage: ?Sized + AsyncReadableStorageTraits> Array<TStorage> {
    /// Open the array at `path` of a hierarchy with consolidated metadata at `.zmetadata` in `storage`.
    ///
    /// See [`open_consolidated`].
    ///
    /// # Errors
    /// Returns [`ConsolidatedMetadataError`] if the consolidated metadata cannot be loaded or the array metadata is missing or invalid.
    pub async fn async_open_consolidated(
        storage: Arc<TStorage>,
        path: &str,
    ) -> Result<Self, ConsolidatedMetadataError> {
        open_consolidated(storage, path).await
    }
}
