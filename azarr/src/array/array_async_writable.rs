use std::borrow::Cow;

use futures::{StreamExt, TryStreamExt};
use log::trace;

use azarr_storage::{AsyncReadableStorageTraits, AsyncWritableStorageTraits, Bytes, StorageError};

use super::{Array, ArrayBuffer, ArrayError, Element};
use crate::indexer::{ChunkSelection, ChunkTask, IndexerKind, Selection, resolve};
use crate::node::{meta_key_v2_array, meta_key_v2_attributes};

/// Returns true if `task` selects every element of its chunk.
fn covers_chunk(task: &ChunkTask, chunk_shape: &[u64]) -> bool {
    match task.chunk_selection() {
        ChunkSelection::Orthogonal(dims) => dims
            .iter()
            .zip(chunk_shape)
            .all(|(dim, &chunk_size)| dim.contiguous_start() == Some(0) && dim.len() == chunk_size),
        ChunkSelection::Points(_) => false,
    }
}

impl<TStorage: ?Sized + AsyncWritableStorageTraits> Array<TStorage> {
    fn check_writable(&self) -> Result<(), StorageError> {
        if self.options.read_only() {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Store the array metadata: `.zarray`, and `.zattrs` if there are attributes.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the array is read only or the store fails.
    pub async fn async_store_metadata(&self) -> Result<(), StorageError> {
        self.check_writable()?;
        let path = self.path();
        let metadata = self.metadata();

        if !metadata.attributes.is_empty() {
            let key = meta_key_v2_attributes(path);
            let json = serde_json::to_vec_pretty(&metadata.attributes)
                .map_err(|err| StorageError::InvalidMetadata(key.clone(), err.to_string()))?;
            self.storage.set(&key, json.into()).await?;
        }

        let key = meta_key_v2_array(path);
        let json = serde_json::to_vec_pretty(metadata)
            .map_err(|err| StorageError::InvalidMetadata(key.clone(), err.to_string()))?;
        self.storage.set(&key, json.into()).await
    }

    /// Erase the chunk at `chunk_indices`.
    ///
    /// Succeeds if the chunk does not exist.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the array is read only or the store fails.
    pub async fn async_erase_chunk(&self, chunk_indices: &[u64]) -> Result<(), StorageError> {
        self.check_writable()?;
        self.storage.erase(&self.chunk_key(chunk_indices)).await
    }

    /// Encode and store `chunk` at `chunk_indices`.
    ///
    /// If every element equals the fill value and [`ArrayOptions::store_empty_chunks`](super::ArrayOptions::store_empty_chunks) is false, the chunk is erased instead.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if the chunk indices are invalid, `chunk` does not have the data type and chunk shape of the array, or the store fails.
    pub async fn async_store_chunk(
        &self,
        chunk_indices: &[u64],
        chunk: &ArrayBuffer,
    ) -> Result<(), ArrayError> {
        self.descriptor.validate_chunk_indices(chunk_indices)?;
        if chunk.data_type() != self.data_type() {
            return Err(ArrayError::IncompatibleDataType(
                chunk.data_type().clone(),
                self.data_type().clone(),
            ));
        }
        let chunk_shape = self.descriptor.chunk_shape_u64();
        if chunk.shape() != chunk_shape {
            return Err(ArrayError::InvalidDataShape(
                chunk.shape().to_vec(),
                chunk_shape,
            ));
        }
        self.async_store_chunk_bytes(chunk_indices, chunk.as_bytes())
            .await
    }

    /// Encode and store the chunk at `chunk_indices` from `elements` in C order.
    ///
    /// # Errors
    /// See [`async_store_chunk`](Array::async_store_chunk).
    pub async fn async_store_chunk_elements<T: Element>(
        &self,
        chunk_indices: &[u64],
        elements: &[T],
    ) -> Result<(), ArrayError> {
        let chunk = ArrayBuffer::from_elements(
            self.data_type().clone(),
            self.descriptor.chunk_shape_u64(),
            elements,
        )?;
        self.async_store_chunk(chunk_indices, &chunk).await
    }

    async fn async_store_chunk_bytes(
        &self,
        chunk_indices: &[u64],
        bytes: &[u8],
    ) -> Result<(), ArrayError> {
        self.check_writable()?;
        let key = self.chunk_key(chunk_indices);
        let is_empty = self
            .fill_value()
            .is_some_and(|fill_value| fill_value.equals_all(bytes));
        if is_empty && !self.options.store_empty_chunks() {
            trace!("chunk {key} is empty, erasing");
            self.storage.erase(&key).await?;
        } else {
            let encoded = self.descriptor.codecs().encode(
                Cow::Borrowed(bytes),
                &self.descriptor.chunk_shape_usize(),
                self.data_type().size(),
            )?;
            self.storage
                .set(&key, Bytes::from(encoded.into_owned()))
                .await?;
        }
        Ok(())
    }

    /// Writing a coordinate selection is not supported.
    ///
    /// # Errors
    /// Always returns [`ArrayError::UnsupportedMethod`].
    pub async fn async_set_coordinate_selection(
        &self,
        _selection: &Selection,
        _value: &ArrayBuffer,
    ) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod(
            "set_coordinate_selection".to_string(),
        ))
    }

    /// Writing a mask selection is not supported.
    ///
    /// # Errors
    /// Always returns [`ArrayError::UnsupportedMethod`].
    pub async fn async_set_mask_selection(
        &self,
        _selection: &Selection,
        _value: &ArrayBuffer,
    ) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("set_mask_selection".to_string()))
    }
}

impl<TStorage: ?Sized + AsyncReadableStorageTraits + AsyncWritableStorageTraits> Array<TStorage> {
    /// Write `value` to an orthogonal selection.
    ///
    /// `value` must have the shape of the selection, or be a scalar that is written to every selected element.
    /// Chunks that are partially covered by the selection are read, updated and written back.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if the selection is invalid, `value` is incompatible, or the store fails.
    pub async fn async_set_orthogonal_selection(
        &self,
        selection: &Selection,
        value: &ArrayBuffer,
    ) -> Result<(), ArrayError> {
        self.check_writable()?;
        if !selection.fields().is_empty() {
            return Err(ArrayError::UnsupportedMethod(
                "set_orthogonal_selection with fields".to_string(),
            ));
        }
        if value.data_type() != self.data_type() {
            return Err(ArrayError::IncompatibleDataType(
                value.data_type().clone(),
                self.data_type().clone(),
            ));
        }
        let indexer = resolve(
            self.shape(),
            self.chunk_shape(),
            selection,
            IndexerKind::Orthogonal,
        )?;
        let broadcast = value.is_scalar() && !indexer.shape().is_empty();
        if !broadcast && value.shape() != indexer.shape() {
            return Err(ArrayError::InvalidDataShape(
                value.shape().to_vec(),
                indexer.shape().to_vec(),
            ));
        }

        let element_size = self.data_type().size();
        let chunk_shape = self.descriptor.chunk_shape_u64();
        let buffer_shape = indexer.buffer_shape();
        let value_bytes = value.as_bytes();
        let engine = self.fetch_engine();

        let update_chunk = |task: ChunkTask| {
            let chunk_shape = &chunk_shape;
            let engine = &engine;
            async move {
                let existing = if covers_chunk(&task, chunk_shape) {
                    None
                } else {
                    engine.retrieve_chunk(task.chunk_coords()).await?
                };
                let mut chunk = existing.unwrap_or_else(|| {
                    ArrayBuffer::new_fill_value(
                        self.data_type().clone(),
                        chunk_shape.clone(),
                        self.fill_value(),
                    )
                    .into_bytes()
                });
                task.for_each_run(chunk_shape, buffer_shape, |chunk_offset, value_offset, len| {
                    #[expect(clippy::cast_possible_truncation)]
                    let (chunk_offset, value_offset, len) =
                        (chunk_offset as usize, value_offset as usize, len as usize);
                    let chunk_bytes = &mut chunk
                        [chunk_offset * element_size..(chunk_offset + len) * element_size];
                    if broadcast {
                        for element in chunk_bytes.chunks_exact_mut(element_size) {
                            element.copy_from_slice(value_bytes);
                        }
                    } else {
                        chunk_bytes.copy_from_slice(
                            &value_bytes
                                [value_offset * element_size..(value_offset + len) * element_size],
                        );
                    }
                });
                self.async_store_chunk_bytes(task.chunk_coords(), &chunk)
                    .await
            }
        };

        futures::stream::iter(indexer.chunk_tasks())
            .map(Ok)
            .try_for_each_concurrent(self.options.concurrent_limit(), update_chunk)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use azarr_storage::store::MemoryStore;
    use azarr_storage::storage_adapter::performance_metrics::PerformanceMetricsStorageAdapter;

    use super::*;
    use crate::array::{ArrayMetadataV2, ArrayOptions};

    fn metadata(json: &str) -> ArrayMetadataV2 {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn array_async_store_chunk_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let array = Array::new_with_metadata(
            store.clone(),
            "arr",
            metadata(
                r#"{"zarr_format": 2, "shape": [4, 3], "chunks": [2, 3], "dtype": ">f8",
                    "compressor": {"id": "zlib", "level": 5}, "fill_value": "NaN",
                    "order": "F", "filters": null}"#,
            ),
        )
        .unwrap();
        array.async_store_metadata().await.unwrap();

        let elements = [1.5f64, -2.0, 3.25, f64::INFINITY, 0.0, -0.0];
        array
            .async_store_chunk_elements(&[1, 0], &elements)
            .await
            .unwrap();
        let chunk = array.async_retrieve_chunk(&[1, 0]).await.unwrap();
        assert_eq!(
            chunk.as_bytes(),
            ArrayBuffer::from_elements(array.data_type().clone(), vec![2, 3], &elements)
                .unwrap()
                .as_bytes()
        );

        let reopened = Array::async_open(store, "arr").await.unwrap();
        assert_eq!(reopened.metadata(), array.metadata());
        let rows = reopened
            .async_get(&Selection::new(vec![(1..3).into()]))
            .await
            .unwrap()
            .to_elements::<f64>()
            .unwrap();
        assert!(rows[..3].iter().all(|value| value.is_nan()));
        assert_eq!(&rows[3..], &elements[..3]);
    }

    #[tokio::test]
    async fn array_async_store_chunk_errors() {
        let store = Arc::new(MemoryStore::new());
        let array = Array::new_with_metadata(
            store,
            "arr",
            metadata(
                r#"{"zarr_format": 2, "shape": [4], "chunks": [2], "dtype": "<i4",
                    "compressor": null, "fill_value": 0, "order": "C", "filters": null}"#,
            ),
        )
        .unwrap();
        assert!(matches!(
            array.async_store_chunk_elements(&[0], &[1i32, 2, 3]).await,
            Err(ArrayError::InvalidBytesInputSize(..))
        ));
        assert!(matches!(
            array.async_store_chunk_elements(&[0], &[1u32, 2]).await,
            Err(ArrayError::IncompatibleElementType(..))
        ));
        assert!(matches!(
            array.async_store_chunk_elements(&[2], &[1i32, 2]).await,
            Err(ArrayError::InvalidChunkGridIndicesError(_))
        ));
        assert!(matches!(
            array
                .async_set_coordinate_selection(
                    &Selection::new(vec![vec![0].into()]),
                    &ArrayBuffer::from_elements(array.data_type().clone(), vec![], &[1i32])
                        .unwrap()
                )
                .await,
            Err(ArrayError::UnsupportedMethod(_))
        ));
    }

    #[tokio::test]
    async fn array_async_store_empty_chunk() {
        let store = Arc::new(PerformanceMetricsStorageAdapter::new(Arc::new(
            MemoryStore::new(),
        )));
        let array = Array::new_with_metadata(
            store.clone(),
            "arr",
            metadata(
                r#"{"zarr_format": 2, "shape": [4], "chunks": [2], "dtype": "|u1",
                    "compressor": null, "fill_value": 9, "order": "C", "filters": null}"#,
            ),
        )
        .unwrap();
        array.async_store_chunk_elements(&[0], &[1u8, 2]).await.unwrap();
        assert!(array.async_retrieve_chunk_if_exists(&[0]).await.unwrap().is_some());
        array.async_store_chunk_elements(&[0], &[9u8, 9]).await.unwrap();
        assert!(array.async_retrieve_chunk_if_exists(&[0]).await.unwrap().is_none());
        assert_eq!(store.keys_erased(), 1);

        let array = array.with_options(ArrayOptions::default().with_store_empty_chunks(true));
        array.async_store_chunk_elements(&[1], &[9u8, 9]).await.unwrap();
        assert!(array.async_retrieve_chunk_if_exists(&[1]).await.unwrap().is_some());
        array.async_erase_chunk(&[1]).await.unwrap();
        assert!(array.async_retrieve_chunk_if_exists(&[1]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn array_async_set_orthogonal_selection() {
        let store = Arc::new(MemoryStore::new());
        let array = Array::new_with_metadata(
            store,
            "arr",
            metadata(
                r#"{"zarr_format": 2, "shape": [3, 3], "chunks": [2, 2], "dtype": "<i2",
                    "compressor": null, "fill_value": -1, "order": "C", "filters": null}"#,
            ),
        )
        .unwrap();

        let value = ArrayBuffer::from_elements(array.data_type().clone(), vec![2, 2], &[1i16, 2, 3, 4])
            .unwrap();
        array
            .async_set_orthogonal_selection(
                &Selection::new(vec![vec![2, 0].into(), (1..3).into()]),
                &value,
            )
            .await
            .unwrap();
        let scalar = ArrayBuffer::from_elements(array.data_type().clone(), vec![], &[5i16]).unwrap();
        array
            .async_set_orthogonal_selection(&Selection::new(vec![1.into(), 0.into()]), &scalar)
            .await
            .unwrap();
        assert_eq!(
            array.async_retrieve_all().await.unwrap().to_elements::<i16>().unwrap(),
            vec![-1, 3, 4, 5, -1, -1, -1, 1, 2]
        );

        assert!(matches!(
            array
                .async_set_orthogonal_selection(&Selection::new(vec![(0..1).into()]), &value)
                .await,
            Err(ArrayError::InvalidDataShape(..))
        ));
    }
}
