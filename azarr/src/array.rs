//! Zarr V2 arrays.
//!
//! An [`Array`] binds an [`ArrayDescriptor`] (shape, chunk shape, data type, fill value, codecs and chunk key encoding) to a store.
//! All data access is asynchronous and follows the `async_` method prefix.
//!
//! ## Reading
//! A selection is resolved by an indexer (see [`crate::indexer`]) into one task per chunk it touches.
//! The tasks are fetched and decoded concurrently by a [`ChunkFetchEngine`] and assembled into an [`ArrayBuffer`].
//!  - [`async_get`](Array::async_get) dispatches on the selection: basic, or coordinate/mask for pure fancy indexing, otherwise orthogonal.
//!  - [`async_get_basic_selection`](Array::async_get_basic_selection), [`async_get_orthogonal_selection`](Array::async_get_orthogonal_selection),
//!    [`async_get_coordinate_selection`](Array::async_get_coordinate_selection) and [`async_get_mask_selection`](Array::async_get_mask_selection) force an indexer kind.
//!  - [`async_retrieve_chunk`](Array::async_retrieve_chunk), [`async_retrieve_encoded_chunk`](Array::async_retrieve_encoded_chunk) and [`async_retrieve_all`](Array::async_retrieve_all).
//!  - [`iter_slabs`](Array::iter_slabs) streams sub-arrays along the first axis.
//!
//! A chunk that does not exist in the store reads as the fill value, or as zeros if the array has no fill value.
//!
//! ## Writing
//! Writes are a thin layer over the store: [`async_store_chunk`](Array::async_store_chunk), [`async_erase_chunk`](Array::async_erase_chunk),
//! [`async_store_metadata`](Array::async_store_metadata) and [`async_set_orthogonal_selection`](Array::async_set_orthogonal_selection).
//!
//! ## Concurrency
//! Async methods do not spawn tasks, so chunk requests are concurrent on the caller's executor but not parallel.
//! The number of chunks in flight can be capped with [`ArrayOptions::set_concurrent_limit`].

mod array_async_readable;
mod array_async_writable;
mod array_buffer;
mod array_errors;
mod array_slabs;
mod chunk_fetch;
pub mod chunk_key_encoding;
pub mod codec;
pub mod data_type;
mod element;
mod fill_value;
mod options;

use std::num::NonZeroU64;
use std::sync::Arc;

pub use azarr_metadata::v2::{
    ArrayMetadataV2, ArrayMetadataV2Order, DataTypeMetadataV2, FillValueMetadataV2,
};
pub use azarr_metadata::Attributes;

pub(crate) use self::array_async_readable::async_retrieve_metadata;
pub use self::array_buffer::ArrayBuffer;
pub use self::array_errors::{ArrayCreateError, ArrayError, ArrayErrorKind};
pub use self::chunk_fetch::ChunkFetchEngine;
pub use self::chunk_key_encoding::{ChunkKeyEncoding, ChunkKeySeparator};
pub use self::codec::{CodecChain, CodecRegistry};
pub use self::data_type::{DataType, FieldProjection, StructuredDataType, StructuredField};
pub use self::element::Element;
pub use self::fill_value::{FillValue, IncompatibleFillValueError};
pub use self::options::ArrayOptions;

use azarr_storage::StoreKey;
use codec::BytesCodec;

use crate::node::{NodePath, data_key};

/// The immutable description of a Zarr V2 array, created from its `.zarray` metadata.
///
/// The shape and chunk shape have the same dimensionality.
/// Chunks at the upper edge of the array are stored with the full chunk shape.
#[derive(Debug, Clone)]
pub struct ArrayDescriptor {
    metadata: ArrayMetadataV2,
    chunk_shape: Vec<NonZeroU64>,
    data_type: DataType,
    fill_value: Option<FillValue>,
    codecs: Arc<CodecChain>,
    chunk_key_encoding: ChunkKeyEncoding,
}

impl ArrayDescriptor {
    /// Create an array descriptor from Zarr V2 array metadata, creating compressors and filters with `codec_registry`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the data type, fill value or a codec is unsupported or invalid, or the shape and chunk shape have different dimensionality.
    pub fn new(
        metadata: ArrayMetadataV2,
        codec_registry: &CodecRegistry,
    ) -> Result<Self, ArrayCreateError> {
        if metadata.chunks.len() != metadata.shape.len() {
            return Err(ArrayCreateError::InvalidChunkShapeDimensionality(
                metadata.chunks.len(),
                metadata.shape.len(),
            ));
        }

        let data_type = DataType::from_metadata_v2(&metadata.dtype)?;
        let byte_swaps = data_type::byte_swap_ranges_v2(&metadata.dtype)?;
        let fill_value =
            FillValue::from_metadata_v2(&metadata.fill_value, &data_type, &byte_swaps)?;

        let filters = metadata
            .filters
            .iter()
            .flatten()
            .map(|filter| codec_registry.create(filter))
            .collect::<Result<Vec<_>, _>>()?;
        if !filters.is_empty() {
            log::warn!(
                "array has filters {:?}, they are applied in reverse order after the compressor on decode",
                filters.iter().map(|filter| filter.id()).collect::<Vec<_>>()
            );
        }
        let compressor = metadata
            .compressor
            .as_ref()
            .map(|compressor| codec_registry.create(compressor))
            .transpose()?;
        let codecs = CodecChain::new(
            metadata.order,
            BytesCodec::new(data_type.size(), byte_swaps),
            filters,
            compressor,
        );

        Ok(Self {
            chunk_shape: metadata.chunks.clone(),
            chunk_key_encoding: ChunkKeyEncoding::new(metadata.dimension_separator),
            data_type,
            fill_value,
            codecs: Arc::new(codecs),
            metadata,
        })
    }

    /// The array metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ArrayMetadataV2 {
        &self.metadata
    }

    /// The array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.metadata.shape
    }

    /// The dimensionality of the array.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.metadata.shape.len()
    }

    /// The chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[NonZeroU64] {
        &self.chunk_shape
    }

    /// The chunk shape as `u64`.
    #[must_use]
    pub fn chunk_shape_u64(&self) -> Vec<u64> {
        self.chunk_shape.iter().map(|size| size.get()).collect()
    }

    /// The chunk shape as `usize`.
    #[must_use]
    pub fn chunk_shape_usize(&self) -> Vec<usize> {
        #[expect(clippy::cast_possible_truncation)]
        let chunk_shape = self
            .chunk_shape
            .iter()
            .map(|size| size.get() as usize)
            .collect();
        chunk_shape
    }

    /// The number of elements in a chunk.
    #[must_use]
    pub fn chunk_num_elements(&self) -> u64 {
        self.chunk_shape.iter().map(|size| size.get()).product()
    }

    /// The number of chunks along each axis.
    #[must_use]
    pub fn chunk_grid_shape(&self) -> Vec<u64> {
        self.metadata
            .shape
            .iter()
            .zip(&self.chunk_shape)
            .map(|(extent, chunk_size)| extent.div_ceil(chunk_size.get()))
            .collect()
    }

    /// The data type.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// The memory order of elements within a chunk.
    #[must_use]
    pub const fn order(&self) -> ArrayMetadataV2Order {
        self.metadata.order
    }

    /// The fill value, if any.
    #[must_use]
    pub const fn fill_value(&self) -> Option<&FillValue> {
        self.fill_value.as_ref()
    }

    /// The codec chain.
    #[must_use]
    pub fn codecs(&self) -> &CodecChain {
        &self.codecs
    }

    /// The chunk key encoding.
    #[must_use]
    pub const fn chunk_key_encoding(&self) -> &ChunkKeyEncoding {
        &self.chunk_key_encoding
    }

    /// Return the store key of the chunk at `chunk_indices` for an array at `path`.
    #[must_use]
    pub fn chunk_key(&self, path: &NodePath, chunk_indices: &[u64]) -> StoreKey {
        data_key(path, &self.chunk_key_encoding.encode(chunk_indices))
    }

    /// Validate chunk indices against the chunk grid.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndicesError`] if the dimensionality is wrong or an index is beyond the grid.
    pub fn validate_chunk_indices(&self, chunk_indices: &[u64]) -> Result<(), ArrayError> {
        let grid_shape = self.chunk_grid_shape();
        if chunk_indices.len() == grid_shape.len()
            && chunk_indices
                .iter()
                .zip(&grid_shape)
                .all(|(index, extent)| index < extent)
        {
            Ok(())
        } else {
            Err(ArrayError::InvalidChunkGridIndicesError(
                chunk_indices.to_vec(),
            ))
        }
    }
}

/// A Zarr V2 array.
///
/// The metadata of an array is read once when it is opened and is immutable afterwards.
/// Chunks are read from and written to `storage`, under the store prefix of the array path.
#[derive(Debug)]
pub struct Array<TStorage: ?Sized> {
    /// The storage of chunks.
    storage: Arc<TStorage>,
    /// The path of the array in a store.
    path: NodePath,
    /// The array descriptor.
    descriptor: ArrayDescriptor,
    /// Options for retrieving and storing.
    options: ArrayOptions,
}

impl<TStorage: ?Sized> Array<TStorage> {
    /// Create an array in `storage` at `path` with `metadata`, using the default codec registry.
    /// This does **not** write to the store, use [`async_store_metadata`](Array::async_store_metadata) to write `metadata` to `storage`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the path or any metadata is invalid or unsupported.
    pub fn new_with_metadata(
        storage: Arc<TStorage>,
        path: &str,
        metadata: ArrayMetadataV2,
    ) -> Result<Self, ArrayCreateError> {
        Self::new_with_metadata_opt(storage, path, metadata, &CodecRegistry::default())
    }

    /// Create an array in `storage` at `path` with `metadata`, creating codecs with `codec_registry`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the path or any metadata is invalid or unsupported.
    pub fn new_with_metadata_opt(
        storage: Arc<TStorage>,
        path: &str,
        metadata: ArrayMetadataV2,
        codec_registry: &CodecRegistry,
    ) -> Result<Self, ArrayCreateError> {
        let path = NodePath::new(path)?;
        let descriptor = ArrayDescriptor::new(metadata, codec_registry)?;
        Ok(Self {
            storage,
            path,
            descriptor,
            options: ArrayOptions::default(),
        })
    }

    /// Replace the storage backing an array.
    pub fn with_storage<TStorage2: ?Sized>(&self, storage: Arc<TStorage2>) -> Array<TStorage2> {
        Array {
            storage,
            path: self.path.clone(),
            descriptor: self.descriptor.clone(),
            options: self.options.clone(),
        }
    }

    /// Set the array options.
    #[must_use]
    pub fn with_options(mut self, options: ArrayOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the array options.
    pub fn set_options(&mut self, options: ArrayOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Get the array options.
    #[must_use]
    pub const fn options(&self) -> &ArrayOptions {
        &self.options
    }

    /// Get the underlying storage backing the array.
    #[must_use]
    pub fn storage(&self) -> Arc<TStorage> {
        self.storage.clone()
    }

    /// Get the node path.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Get the array descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &ArrayDescriptor {
        &self.descriptor
    }

    /// Get the array metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ArrayMetadataV2 {
        self.descriptor.metadata()
    }

    /// Get the attributes, read from `.zattrs` when the array was opened.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.descriptor.metadata().attributes
    }

    /// Get the array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        self.descriptor.shape()
    }

    /// Get the array dimensionality.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.descriptor.dimensionality()
    }

    /// Get the chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[NonZeroU64] {
        self.descriptor.chunk_shape()
    }

    /// Get the data type.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        self.descriptor.data_type()
    }

    /// Get the fill value.
    #[must_use]
    pub const fn fill_value(&self) -> Option<&FillValue> {
        self.descriptor.fill_value()
    }

    /// Return the number of chunks along each axis.
    #[must_use]
    pub fn chunk_grid_shape(&self) -> Vec<u64> {
        self.descriptor.chunk_grid_shape()
    }

    /// Return the store key of the chunk at `chunk_indices`.
    #[must_use]
    pub fn chunk_key(&self, chunk_indices: &[u64]) -> StoreKey {
        self.descriptor.chunk_key(&self.path, chunk_indices)
    }

    fn fetch_engine(&self) -> ChunkFetchEngine<'_, TStorage> {
        ChunkFetchEngine::new(
            &self.storage,
            &self.path,
            &self.descriptor,
            self.options.concurrent_limit(),
        )
    }
}
