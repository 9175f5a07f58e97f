use std::borrow::Cow;

use futures::{StreamExt, TryStreamExt};
use log::{debug, trace};
use unsafe_cell_slice::UnsafeCellSlice;

use azarr_storage::{AsyncReadableStorageTraits, Bytes};

use super::{ArrayDescriptor, ArrayError, FieldProjection};
use crate::indexer::{ChunkIndexerTraits, ChunkTask};
use crate::node::NodePath;

/// Fetches, decodes and assembles the chunks of a selection.
///
/// There is one task per chunk touched by a selection.
/// Tasks run concurrently on the caller's executor and each writes to a disjoint region of the output, so the order in which chunks arrive does not affect the result.
/// The first error (a failed store request or an undecodable chunk) aborts the whole gather.
#[derive(Debug)]
pub struct ChunkFetchEngine<'a, TStorage: ?Sized> {
    storage: &'a TStorage,
    path: &'a NodePath,
    descriptor: &'a ArrayDescriptor,
    concurrent_limit: Option<usize>,
}

impl<'a, TStorage: ?Sized> ChunkFetchEngine<'a, TStorage> {
    /// Create a new chunk fetch engine for the array at `path` described by `descriptor`.
    ///
    /// At most `concurrent_limit` chunks are in flight at once, or every chunk of a selection if [`None`].
    #[must_use]
    pub fn new(
        storage: &'a TStorage,
        path: &'a NodePath,
        descriptor: &'a ArrayDescriptor,
        concurrent_limit: Option<usize>,
    ) -> Self {
        Self {
            storage,
            path,
            descriptor,
            concurrent_limit,
        }
    }
}

impl<TStorage: ?Sized + AsyncReadableStorageTraits> ChunkFetchEngine<'_, TStorage> {
    /// Retrieve the encoded bytes of the chunk at `chunk_indices`, or [`None`] if it does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`](azarr_storage::StorageError) wrapped in [`ArrayError`] if the store fails.
    pub async fn retrieve_encoded_chunk(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<Bytes>, ArrayError> {
        let key = self.descriptor.chunk_key(self.path, chunk_indices);
        let bytes = self.storage.get(&key).await?;
        if bytes.is_none() {
            trace!("chunk {key} is missing");
        }
        Ok(bytes)
    }

    /// Retrieve and decode the chunk at `chunk_indices` into elements in native byte order and C order.
    ///
    /// Returns [`None`] if the chunk does not exist.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if the store fails or the chunk cannot be decoded.
    pub async fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Option<Vec<u8>>, ArrayError> {
        let Some(encoded) = self.retrieve_encoded_chunk(chunk_indices).await? else {
            return Ok(None);
        };
        Ok(Some(self.decode(&encoded)?.into_owned()))
    }

    fn decode<'b>(&self, encoded: &'b [u8]) -> Result<Cow<'b, [u8]>, ArrayError> {
        Ok(self.descriptor.codecs().decode(
            Cow::Borrowed(encoded),
            &self.descriptor.chunk_shape_usize(),
            self.descriptor.data_type().size(),
        )?)
    }

    /// Gather the selection of `indexer` into a new buffer of elements of the data type of `projection`.
    ///
    /// The returned bytes are in C order with the shape of [`ChunkIndexerTraits::buffer_shape`].
    /// Regions of missing chunks hold the projected fill value, or zeros if the array has no fill value.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if any store request fails or any chunk cannot be decoded.
    pub async fn gather(
        &self,
        indexer: &dyn ChunkIndexerTraits,
        projection: &FieldProjection,
    ) -> Result<Vec<u8>, ArrayError> {
        #[expect(clippy::cast_possible_truncation)]
        let size_output = indexer.num_elements() as usize * projection.data_type().size();
        let mut output = vec![0u8; size_output];
        self.gather_impl(indexer, projection, &mut output, true)
            .await?;
        Ok(output)
    }

    /// Gather the selection of `indexer` into `output`, a caller-owned buffer of elements of the data type of `projection`.
    ///
    /// `output` is in C order with the shape of [`ChunkIndexerTraits::buffer_shape`].
    /// Regions of missing chunks are set to the projected fill value, and are left untouched if the array has no fill value.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidBytesInputSize`] if `output` does not hold exactly the selected elements.
    /// Returns [`ArrayError`] if any store request fails or any chunk cannot be decoded.
    pub async fn gather_into(
        &self,
        indexer: &dyn ChunkIndexerTraits,
        projection: &FieldProjection,
        output: &mut [u8],
    ) -> Result<(), ArrayError> {
        let expected = indexer.num_elements() * projection.data_type().size() as u64;
        if output.len() as u64 != expected {
            return Err(ArrayError::InvalidBytesInputSize(output.len(), expected));
        }
        self.gather_impl(indexer, projection, output, false).await
    }

    async fn gather_impl(
        &self,
        indexer: &dyn ChunkIndexerTraits,
        projection: &FieldProjection,
        output: &mut [u8],
        output_is_zeroed: bool,
    ) -> Result<(), ArrayError> {
        let element_size = projection.data_type().size();
        let chunk_shape = self.descriptor.chunk_shape_u64();
        let buffer_shape = indexer.buffer_shape();
        let fill_value = self
            .descriptor
            .fill_value()
            .filter(|fill_value| !(output_is_zeroed && fill_value.is_zero()))
            .map(|fill_value| projection.apply(Cow::Borrowed(fill_value.as_ne_bytes())));

        debug!(
            "gathering {} {} selection of {:?} from {}",
            indexer.kind(),
            self.descriptor.data_type(),
            indexer.shape(),
            self.path
        );

        {
            let output_slice = UnsafeCellSlice::new(output);
            let chunk_shape = &chunk_shape;
            let fill_value = fill_value.as_deref();
            let fetch_chunk = |task: ChunkTask| async move {
                let copy_runs = |source: Option<&[u8]>| {
                    task.for_each_run(chunk_shape, buffer_shape, |chunk_offset, output_offset, len| {
                        #[expect(clippy::cast_possible_truncation)]
                        let (chunk_offset, output_offset, len) =
                            (chunk_offset as usize, output_offset as usize, len as usize);
                        let output_range =
                            output_offset * element_size..(output_offset + len) * element_size;
                        // SAFETY: chunks represent disjoint regions of the output
                        let output = unsafe { output_slice.index_mut(output_range) };
                        match source {
                            Some(chunk) => output.copy_from_slice(
                                &chunk[chunk_offset * element_size
                                    ..(chunk_offset + len) * element_size],
                            ),
                            None => {
                                if let Some(fill_value) = fill_value {
                                    for element in output.chunks_exact_mut(element_size) {
                                        element.copy_from_slice(fill_value);
                                    }
                                }
                            }
                        }
                    });
                };

                match self.retrieve_encoded_chunk(task.chunk_coords()).await? {
                    Some(encoded) => {
                        let decoded = projection.apply(self.decode(&encoded)?);
                        copy_runs(Some(&decoded));
                    }
                    None if fill_value.is_some() => copy_runs(None),
                    None => {}
                }
                Ok::<_, ArrayError>(())
            };

            futures::stream::iter(indexer.chunk_tasks())
                .map(Ok)
                .try_for_each_concurrent(self.concurrent_limit, fetch_chunk)
                .await?;
        }
        Ok(())
    }
}
