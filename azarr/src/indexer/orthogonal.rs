use std::collections::BTreeMap;
use std::num::NonZeroU64;

use itertools::Itertools;

use super::{
    ChunkIndexerTraits, ChunkSelection, ChunkTask, DimSelection, IndexerError, IndexerKind,
    OutputSelection, SelectionItem, normalise_index,
};

/// The part of a per axis selection that falls within one chunk.
#[derive(Clone, Debug)]
struct DimChunk {
    chunk_index: u64,
    chunk_selection: DimSelection,
    output_selection: DimSelection,
}

/// An indexer for basic and orthogonal selections.
///
/// Each axis is resolved independently into the chunks it touches, and chunk tasks are the outer product of the per axis chunks.
#[derive(Clone, Debug)]
pub struct OrthogonalIndexer {
    kind: IndexerKind,
    shape: Vec<u64>,
    buffer_shape: Vec<u64>,
    dims: Vec<Vec<DimChunk>>,
}

impl OrthogonalIndexer {
    /// Create a new orthogonal (or basic) indexer from selection `items` with one item per axis of an array with `array_shape` and `chunk_shape`.
    ///
    /// # Errors
    /// Returns [`IndexerError`] if an item is invalid or not supported by `kind`.
    pub fn new(
        array_shape: &[u64],
        chunk_shape: &[NonZeroU64],
        items: &[SelectionItem],
        kind: IndexerKind,
    ) -> Result<Self, IndexerError> {
        let mut shape = Vec::with_capacity(items.len());
        let mut buffer_shape = Vec::with_capacity(items.len());
        let mut dims = Vec::with_capacity(items.len());
        let mut axis = 0;
        for item in items {
            let (Some(&extent), Some(chunk_size)) = (array_shape.get(axis), chunk_shape.get(axis))
            else {
                return Err(IndexerError::TooManyIndices(axis + 1, array_shape.len()));
            };
            let chunk_size = chunk_size.get();
            let dim = match item {
                SelectionItem::Index(index) => {
                    let index = normalise_index(*index, axis, extent)?;
                    buffer_shape.push(1);
                    vec![DimChunk {
                        chunk_index: index / chunk_size,
                        chunk_selection: DimSelection::contiguous(index % chunk_size, 1),
                        output_selection: DimSelection::contiguous(0, 1),
                    }]
                }
                SelectionItem::Slice(slice) => {
                    let (start, step, len) = slice.indices(extent)?;
                    shape.push(len);
                    buffer_shape.push(len);
                    slice_dim(start, step, len, chunk_size)
                }
                SelectionItem::Indices(indices) if kind == IndexerKind::Orthogonal => {
                    let indices = indices
                        .iter()
                        .map(|&index| normalise_index(index, axis, extent))
                        .collect::<Result<Vec<_>, _>>()?;
                    shape.push(indices.len() as u64);
                    buffer_shape.push(indices.len() as u64);
                    indices_dim(&indices, chunk_size)
                }
                SelectionItem::Mask {
                    values,
                    shape: mask_shape,
                } if kind == IndexerKind::Orthogonal && mask_shape.len() == 1 => {
                    if mask_shape[0] != extent {
                        return Err(IndexerError::MaskShapeMismatch(
                            mask_shape.clone(),
                            vec![extent],
                        ));
                    }
                    let indices = values
                        .iter()
                        .positions(|&selected| selected)
                        .map(|index| index as u64)
                        .collect_vec();
                    shape.push(indices.len() as u64);
                    buffer_shape.push(indices.len() as u64);
                    indices_dim(&indices, chunk_size)
                }
                item => {
                    return Err(IndexerError::UnsupportedItem {
                        kind,
                        item: format!("{item:?}"),
                    });
                }
            };
            dims.push(dim);
            axis += 1;
        }
        if axis != array_shape.len() {
            return Err(IndexerError::IncompatibleDimensionality(
                axis,
                array_shape.len(),
            ));
        }
        Ok(Self {
            kind,
            shape,
            buffer_shape,
            dims,
        })
    }
}

/// Split `len` indices from `start` with `step` into the chunks of `chunk_size` they touch.
fn slice_dim(start: u64, step: u64, len: u64, chunk_size: u64) -> Vec<DimChunk> {
    if len == 0 {
        return vec![];
    }
    let last = start + (len - 1) * step;
    (start / chunk_size..=last / chunk_size)
        .filter_map(|chunk_index| {
            let chunk_start = chunk_index * chunk_size;
            let chunk_end = (chunk_start + chunk_size).min(last + 1);
            let first = if chunk_start <= start {
                start
            } else {
                start + (chunk_start - start).div_ceil(step) * step
            };
            if first >= chunk_end {
                // the step skips this chunk
                return None;
            }
            let count = (chunk_end - first).div_ceil(step);
            Some(DimChunk {
                chunk_index,
                chunk_selection: DimSelection::Range {
                    start: first - chunk_start,
                    step,
                    len: count,
                },
                output_selection: DimSelection::contiguous((first - start) / step, count),
            })
        })
        .collect()
}

/// Group `indices` by chunk, retaining their output positions.
fn indices_dim(indices: &[u64], chunk_size: u64) -> Vec<DimChunk> {
    let mut chunks: BTreeMap<u64, (Vec<u64>, Vec<u64>)> = BTreeMap::new();
    for (position, &index) in indices.iter().enumerate() {
        let (chunk_indices, positions) = chunks.entry(index / chunk_size).or_default();
        chunk_indices.push(index % chunk_size);
        positions.push(position as u64);
    }
    chunks
        .into_iter()
        .map(|(chunk_index, (chunk_indices, positions))| DimChunk {
            chunk_index,
            chunk_selection: DimSelection::Indices(chunk_indices),
            output_selection: DimSelection::Indices(positions),
        })
        .collect()
}

impl ChunkIndexerTraits for OrthogonalIndexer {
    fn kind(&self) -> IndexerKind {
        self.kind
    }

    fn shape(&self) -> &[u64] {
        &self.shape
    }

    fn buffer_shape(&self) -> &[u64] {
        &self.buffer_shape
    }

    fn chunk_tasks(&self) -> Box<dyn Iterator<Item = ChunkTask> + Send + '_> {
        if self.dims.is_empty() {
            return Box::new(std::iter::once(ChunkTask::new(
                vec![],
                ChunkSelection::Orthogonal(vec![]),
                OutputSelection::Orthogonal(vec![]),
            )));
        }
        Box::new(
            self.dims
                .iter()
                .map(|dim| dim.iter())
                .multi_cartesian_product()
                .map(|dim_chunks| {
                    ChunkTask::new(
                        dim_chunks.iter().map(|dim| dim.chunk_index).collect(),
                        ChunkSelection::Orthogonal(
                            dim_chunks
                                .iter()
                                .map(|dim| dim.chunk_selection.clone())
                                .collect(),
                        ),
                        OutputSelection::Orthogonal(
                            dim_chunks
                                .iter()
                                .map(|dim| dim.output_selection.clone())
                                .collect(),
                        ),
                    )
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{Selection, Slice};

    fn indexer(
        shape: &[u64],
        chunk_shape: &[u64],
        selection: &Selection,
        kind: IndexerKind,
    ) -> Result<OrthogonalIndexer, IndexerError> {
        let chunk_shape: Vec<NonZeroU64> = chunk_shape
            .iter()
            .map(|&s| NonZeroU64::new(s).unwrap())
            .collect();
        let items = selection.expand(shape.len())?;
        OrthogonalIndexer::new(shape, &chunk_shape, &items, kind)
    }

    #[test]
    fn orthogonal_indexer_basic() {
        // arr[1, 1:9:3] of a [4, 10] array with [2, 4] chunks
        let selection = Selection::new(vec![
            1.into(),
            Slice::new(Some(1), Some(9), Some(3)).into(),
        ]);
        let indexer = indexer(&[4, 10], &[2, 4], &selection, IndexerKind::Basic).unwrap();
        assert_eq!(indexer.shape(), &[3]);
        assert_eq!(indexer.buffer_shape(), &[1, 3]);
        let tasks = indexer.chunk_tasks().collect_vec();
        // columns 1, 4, 7 are in chunks 0, 1, 1
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].chunk_coords(), &[0, 0]);
        assert_eq!(tasks[1].chunk_coords(), &[0, 1]);
        assert_eq!(
            tasks[1].chunk_selection(),
            &ChunkSelection::Orthogonal(vec![
                DimSelection::contiguous(1, 1),
                DimSelection::Range {
                    start: 0,
                    step: 3,
                    len: 2
                },
            ])
        );
        assert_eq!(
            tasks[1].output_selection(),
            &OutputSelection::Orthogonal(vec![
                DimSelection::contiguous(0, 1),
                DimSelection::contiguous(1, 2),
            ])
        );
    }

    #[test]
    fn orthogonal_indexer_step_skips_chunks() {
        let selection = Selection::new(vec![Slice::full().with_step(5).into()]);
        let indexer = indexer(&[12], &[2], &selection, IndexerKind::Basic).unwrap();
        assert_eq!(indexer.shape(), &[3]);
        let chunks = indexer
            .chunk_tasks()
            .map(|task| task.chunk_coords()[0])
            .collect_vec();
        // indices 0, 5, 10
        assert_eq!(chunks, vec![0, 2, 5]);
    }

    #[test]
    fn orthogonal_indexer_indices() {
        let selection = Selection::new(vec![vec![2, 0, -1].into(), (..).into()]);
        let indexer = indexer(&[3, 3], &[2, 3], &selection, IndexerKind::Orthogonal).unwrap();
        assert_eq!(indexer.shape(), &[3, 3]);
        let tasks = indexer.chunk_tasks().collect_vec();
        assert_eq!(tasks.len(), 2);
        assert_eq!(
            tasks[0].output_selection(),
            &OutputSelection::Orthogonal(vec![
                DimSelection::Indices(vec![1]),
                DimSelection::contiguous(0, 3),
            ])
        );
        assert_eq!(
            tasks[1].chunk_selection(),
            &ChunkSelection::Orthogonal(vec![
                DimSelection::Indices(vec![0, 0]),
                DimSelection::contiguous(0, 3),
            ])
        );
        assert_eq!(
            tasks[1].output_selection(),
            &OutputSelection::Orthogonal(vec![
                DimSelection::Indices(vec![0, 2]),
                DimSelection::contiguous(0, 3),
            ])
        );
    }

    #[test]
    fn orthogonal_indexer_mask() {
        let selection = Selection::new(vec![(..).into(), vec![true, false, true].into()]);
        let mask_indexer = indexer(&[2, 3], &[2, 2], &selection, IndexerKind::Orthogonal).unwrap();
        assert_eq!(mask_indexer.shape(), &[2, 2]);
        assert_eq!(mask_indexer.chunk_tasks().count(), 2);

        let selection = Selection::new(vec![vec![true, false].into()]);
        assert!(matches!(
            indexer(&[3], &[2], &selection, IndexerKind::Orthogonal),
            Err(IndexerError::MaskShapeMismatch(_, _))
        ));
    }

    #[test]
    fn orthogonal_indexer_empty() {
        let selection = Selection::new(vec![(2..2).into(), Vec::<i64>::new().into()]);
        let indexer = indexer(&[4, 4], &[2, 2], &selection, IndexerKind::Orthogonal).unwrap();
        assert_eq!(indexer.shape(), &[0, 0]);
        assert_eq!(indexer.num_elements(), 0);
        assert_eq!(indexer.chunk_tasks().count(), 0);
    }

    #[test]
    fn basic_indexer_rejects_fancy() {
        let selection = Selection::new(vec![vec![0].into()]);
        assert!(matches!(
            indexer(&[4], &[2], &selection, IndexerKind::Basic),
            Err(IndexerError::UnsupportedItem {
                kind: IndexerKind::Basic,
                ..
            })
        ));
    }

    #[test]
    fn orthogonal_indexer_restartable() {
        let indexer = indexer(&[4, 4], &[2, 2], &Selection::all(), IndexerKind::Basic).unwrap();
        let first = indexer.chunk_tasks().collect_vec();
        let coords = first.iter().map(|t| t.chunk_coords().to_vec()).collect_vec();
        assert_eq!(coords, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
        assert_eq!(indexer.chunk_tasks().collect_vec(), first);
    }
}
