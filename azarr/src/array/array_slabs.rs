use std::ops::Range;

use futures::{Stream, StreamExt, TryStreamExt};

use azarr_storage::AsyncReadableStorageTraits;

use super::{Array, ArrayBuffer, ArrayError};
use crate::indexer::{Selection, SelectionItem};

/// Split `start..end` at multiples of `chunk_size`.
fn chunk_aligned_windows(start: u64, end: u64, chunk_size: u64) -> impl Iterator<Item = Range<u64>> {
    let next_boundary = move |index: u64| (index / chunk_size + 1) * chunk_size;
    std::iter::successors((start < end).then_some(start), move |&index| {
        Some(next_boundary(index)).filter(|&next| next < end)
    })
    .map(move |index| index..next_boundary(index).min(end))
}

impl<TStorage: ?Sized + AsyncReadableStorageTraits> Array<TStorage> {
    /// Iterate over the sub-arrays at indices `start..end` of the first axis.
    ///
    /// Each chunk-aligned slab along the first axis is retrieved once, then split into one [`ArrayBuffer`] per index.
    /// `end` is clamped to the extent of the first axis.
    /// The stream is finite and is consumed by iteration.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if the array is zero-dimensional.
    /// The stream yields an [`ArrayError`] if a slab cannot be retrieved, and ends after the first error.
    pub fn iter_slabs(
        &self,
        start: u64,
        end: u64,
    ) -> Result<impl Stream<Item = Result<ArrayBuffer, ArrayError>> + '_, ArrayError> {
        let (Some(&extent), Some(chunk_size)) = (self.shape().first(), self.chunk_shape().first())
        else {
            return Err(ArrayError::UnsupportedMethod(
                "iter_slabs of a zero-dimensional array".to_string(),
            ));
        };
        let windows = chunk_aligned_windows(start, end.min(extent), chunk_size.get());
        Ok(futures::stream::iter(windows)
            .then(move |window| async move {
                #[expect(clippy::cast_possible_wrap)]
                let window = window.start as i64..window.end as i64;
                self.async_get_basic_selection(&Selection::new(vec![SelectionItem::from(window)]))
                    .await
            })
            .map_ok(|slab| futures::stream::iter(slab.split_first_axis().into_iter().map(Ok)))
            .try_flatten())
    }
}
