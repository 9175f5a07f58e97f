use std::borrow::Cow;
use std::sync::Arc;

use azarr_storage::{AsyncReadableStorageTraits, Bytes};

use super::{
    Array, ArrayBuffer, ArrayCreateError, ArrayError, ArrayMetadataV2, CodecRegistry,
    FieldProjection, FillValue,
};
use crate::indexer::{IndexerKind, Selection, infer_kind, resolve};
use crate::node::{NodePath, meta_key_v2_array, meta_key_v2_attributes};

/// Retrieve the Zarr V2 metadata (`.zarray` and optional `.zattrs`) of the array at `path` from `storage`.
pub(crate) async fn async_retrieve_metadata<TStorage: ?Sized + AsyncReadableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<ArrayMetadataV2, ArrayCreateError> {
    let key = meta_key_v2_array(path);
    let Some(metadata) = storage.get(&key).await? else {
        return Err(ArrayCreateError::MissingMetadata(key));
    };
    let mut metadata: ArrayMetadataV2 = serde_json::from_slice(&metadata)
        .map_err(|err| ArrayCreateError::InvalidMetadata(key, err.to_string()))?;

    let attributes_key = meta_key_v2_attributes(path);
    if let Some(attributes) = storage.get(&attributes_key).await? {
        metadata.attributes = serde_json::from_slice(&attributes)
            .map_err(|err| ArrayCreateError::InvalidMetadata(attributes_key, err.to_string()))?;
    }
    Ok(metadata)
}

fn check_output_shape(output: &ArrayBuffer, shape: &[u64]) -> Result<(), ArrayError> {
    if output.shape() == shape {
        Ok(())
    } else {
        Err(ArrayError::InvalidDataShape(
            output.shape().to_vec(),
            shape.to_vec(),
        ))
    }
}

impl<TStorage: ?Sized + AsyncReadableStorageTraits> Array<TStorage> {
    /// Open an existing array in `storage` at `path`, reading its `.zarray` and `.zattrs` metadata.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the metadata is missing, invalid or unsupported.
    pub async fn async_open(storage: Arc<TStorage>, path: &str) -> Result<Self, ArrayCreateError> {
        Self::async_open_opt(storage, path, &CodecRegistry::default()).await
    }

    /// Open an existing array in `storage` at `path`, creating codecs with `codec_registry`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the metadata is missing, invalid or unsupported.
    pub async fn async_open_opt(
        storage: Arc<TStorage>,
        path: &str,
        codec_registry: &CodecRegistry,
    ) -> Result<Self, ArrayCreateError> {
        let node_path = NodePath::new(path)?;
        let metadata = async_retrieve_metadata(&*storage, &node_path).await?;
        Self::new_with_metadata_opt(storage, path, metadata, codec_registry)
    }

    /// Read a selection, choosing the indexer from the selection.
    ///
    /// A selection of integers, slices and an ellipsis is a basic selection.
    /// A selection with an integer list on every axis is a coordinate selection, and a single boolean mask with the shape of the array is a mask selection.
    /// Any other selection with integer lists or boolean masks is an orthogonal selection.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if the selection is invalid, a store request fails, or a chunk cannot be decoded.
    /// An invalid selection is reported before the store is accessed.
    pub async fn async_get(&self, selection: &Selection) -> Result<ArrayBuffer, ArrayError> {
        let kind = infer_kind(selection, self.dimensionality());
        self.async_get_selection(selection, kind).await
    }

    /// Read a basic selection: integers, slices and an ellipsis.
    ///
    /// Integer items remove their axis from the result.
    ///
    /// # Errors
    /// See [`async_get`](Array::async_get).
    pub async fn async_get_basic_selection(
        &self,
        selection: &Selection,
    ) -> Result<ArrayBuffer, ArrayError> {
        self.async_get_selection(selection, IndexerKind::Basic).await
    }

    /// Read an orthogonal selection, where integer lists and boolean masks select independently along each axis.
    ///
    /// # Errors
    /// See [`async_get`](Array::async_get).
    pub async fn async_get_orthogonal_selection(
        &self,
        selection: &Selection,
    ) -> Result<ArrayBuffer, ArrayError> {
        self.async_get_selection(selection, IndexerKind::Orthogonal)
            .await
    }

    /// Read a coordinate selection, one integer list per axis interpreted element-wise.
    ///
    /// The result is one dimensional, with elements in the order of the coordinates.
    ///
    /// # Errors
    /// See [`async_get`](Array::async_get).
    pub async fn async_get_coordinate_selection(
        &self,
        selection: &Selection,
    ) -> Result<ArrayBuffer, ArrayError> {
        self.async_get_selection(selection, IndexerKind::Coordinate)
            .await
    }

    /// Read a mask selection, a boolean mask with the shape of the array.
    ///
    /// The result is one dimensional, with the selected elements in C order.
    ///
    /// # Errors
    /// See [`async_get`](Array::async_get).
    pub async fn async_get_mask_selection(
        &self,
        selection: &Selection,
    ) -> Result<ArrayBuffer, ArrayError> {
        self.async_get_selection(selection, IndexerKind::Mask).await
    }

    /// Read a selection into `output`, choosing the indexer from the selection.
    ///
    /// Elements of `output` in missing chunks are set to the fill value, or left untouched if the array has no fill value.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleDataType`] or [`ArrayError::InvalidDataShape`] if `output` does not match the selection.
    /// Otherwise see [`async_get`](Array::async_get).
    pub async fn async_get_into(
        &self,
        selection: &Selection,
        output: &mut ArrayBuffer,
    ) -> Result<(), ArrayError> {
        let kind = infer_kind(selection, self.dimensionality());
        self.async_get_selection_into(selection, kind, output).await
    }

    /// Read a basic selection into `output`.
    ///
    /// # Errors
    /// See [`async_get_into`](Array::async_get_into).
    pub async fn async_get_basic_selection_into(
        &self,
        selection: &Selection,
        output: &mut ArrayBuffer,
    ) -> Result<(), ArrayError> {
        self.async_get_selection_into(selection, IndexerKind::Basic, output)
            .await
    }

    /// Read an orthogonal selection into `output`.
    ///
    /// # Errors
    /// See [`async_get_into`](Array::async_get_into).
    pub async fn async_get_orthogonal_selection_into(
        &self,
        selection: &Selection,
        output: &mut ArrayBuffer,
    ) -> Result<(), ArrayError> {
        self.async_get_selection_into(selection, IndexerKind::Orthogonal, output)
            .await
    }

    /// Read a coordinate selection into `output`.
    ///
    /// # Errors
    /// See [`async_get_into`](Array::async_get_into).
    pub async fn async_get_coordinate_selection_into(
        &self,
        selection: &Selection,
        output: &mut ArrayBuffer,
    ) -> Result<(), ArrayError> {
        self.async_get_selection_into(selection, IndexerKind::Coordinate, output)
            .await
    }

    /// Read a mask selection into `output`.
    ///
    /// # Errors
    /// See [`async_get_into`](Array::async_get_into).
    pub async fn async_get_mask_selection_into(
        &self,
        selection: &Selection,
        output: &mut ArrayBuffer,
    ) -> Result<(), ArrayError> {
        self.async_get_selection_into(selection, IndexerKind::Mask, output)
            .await
    }

    /// Read the entire array.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if a store request fails or a chunk cannot be decoded.
    pub async fn async_retrieve_all(&self) -> Result<ArrayBuffer, ArrayError> {
        self.async_get_basic_selection(&Selection::all()).await
    }

    async fn async_get_selection(
        &self,
        selection: &Selection,
        kind: IndexerKind,
    ) -> Result<ArrayBuffer, ArrayError> {
        let projection = self.data_type().project_fields(selection.fields())?;
        if self.dimensionality() == 0 && kind == IndexerKind::Basic {
            selection.expand(0)?;
            return self.async_retrieve_scalar(&projection).await;
        }
        let indexer = resolve(self.shape(), self.chunk_shape(), selection, kind)?;
        let bytes = self
            .fetch_engine()
            .gather(indexer.as_ref(), &projection)
            .await?;
        ArrayBuffer::new(
            projection.data_type().clone(),
            indexer.shape().to_vec(),
            bytes,
        )
    }

    async fn async_get_selection_into(
        &self,
        selection: &Selection,
        kind: IndexerKind,
        output: &mut ArrayBuffer,
    ) -> Result<(), ArrayError> {
        let projection = self.data_type().project_fields(selection.fields())?;
        if output.data_type() != projection.data_type() {
            return Err(ArrayError::IncompatibleDataType(
                output.data_type().clone(),
                projection.data_type().clone(),
            ));
        }
        if self.dimensionality() == 0 && kind == IndexerKind::Basic {
            selection.expand(0)?;
            check_output_shape(output, &[])?;
            return self
                .async_retrieve_scalar_into(&projection, output.as_bytes_mut())
                .await;
        }
        let indexer = resolve(self.shape(), self.chunk_shape(), selection, kind)?;
        check_output_shape(output, indexer.shape())?;
        self.fetch_engine()
            .gather_into(indexer.as_ref(), &projection, output.as_bytes_mut())
            .await
    }

    async fn async_retrieve_scalar_into(
        &self,
        projection: &FieldProjection,
        output: &mut [u8],
    ) -> Result<(), ArrayError> {
        let element = match self.fetch_engine().retrieve_chunk(&[]).await? {
            Some(bytes) => projection.apply(Cow::Owned(bytes)),
            None => match self.fill_value() {
                Some(fill_value) => projection.apply(Cow::Borrowed(fill_value.as_ne_bytes())),
                None => return Ok(()),
            },
        };
        output.copy_from_slice(&element);
        Ok(())
    }

    async fn async_retrieve_scalar(
        &self,
        projection: &FieldProjection,
    ) -> Result<ArrayBuffer, ArrayError> {
        match self.fetch_engine().retrieve_chunk(&[]).await? {
            Some(bytes) => ArrayBuffer::new(
                projection.data_type().clone(),
                vec![],
                projection.apply(Cow::Owned(bytes)).into_owned(),
            ),
            None => {
                let fill_value = self
                    .fill_value()
                    .map(|fill_value| projection.apply(Cow::Borrowed(fill_value.as_ne_bytes())))
                    .map(|bytes| FillValue::new(bytes.into_owned()));
                Ok(ArrayBuffer::new_fill_value(
                    projection.data_type().clone(),
                    vec![],
                    fill_value.as_ref(),
                ))
            }
        }
    }

    /// Retrieve the encoded bytes of the chunk at `chunk_indices`, or [`None`] if it does not exist.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if the chunk indices are invalid or the store fails.
    pub async fn async_retrieve_encoded_chunk(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<Bytes>, ArrayError> {
        self.descriptor.validate_chunk_indices(chunk_indices)?;
        self.fetch_engine()
            .retrieve_encoded_chunk(chunk_indices)
            .await
    }

    /// Retrieve and decode the chunk at `chunk_indices`, or [`None`] if it does not exist.
    ///
    /// The result has the chunk shape, including at the upper edge of the array.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if the chunk indices are invalid, the store fails, or the chunk cannot be decoded.
    pub async fn async_retrieve_chunk_if_exists(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<ArrayBuffer>, ArrayError> {
        self.descriptor.validate_chunk_indices(chunk_indices)?;
        self.fetch_engine()
            .retrieve_chunk(chunk_indices)
            .await?
            .map(|bytes| {
                ArrayBuffer::new(
                    self.data_type().clone(),
                    self.descriptor.chunk_shape_u64(),
                    bytes,
                )
            })
            .transpose()
    }

    /// Retrieve and decode the chunk at `chunk_indices`.
    ///
    /// A chunk that does not exist is filled with the fill value, or zeros if the array has no fill value.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if the chunk indices are invalid, the store fails, or the chunk cannot be decoded.
    pub async fn async_retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<ArrayBuffer, ArrayError> {
        match self.async_retrieve_chunk_if_exists(chunk_indices).await? {
            Some(chunk) => Ok(chunk),
            None => Ok(ArrayBuffer::new_fill_value(
                self.data_type().clone(),
                self.descriptor.chunk_shape_u64(),
                self.fill_value(),
            )),
        }
    }
}
