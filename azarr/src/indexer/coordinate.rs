use std::collections::BTreeMap;
use std::num::NonZeroU64;

use itertools::Itertools;

use super::{
    ChunkIndexerTraits, ChunkSelection, ChunkTask, IndexerError, IndexerKind, OutputSelection,
    SelectionItem, c_strides, normalise_index,
};

/// The points of a coordinate selection that fall within one chunk.
#[derive(Clone, Debug, Default)]
struct ChunkPoints {
    points: Vec<Vec<u64>>,
    positions: Vec<u64>,
}

/// An indexer for coordinate and mask selections.
///
/// Points are grouped by chunk, and the output is one dimensional with points in selection order.
#[derive(Clone, Debug)]
pub struct CoordinateIndexer {
    kind: IndexerKind,
    shape: Vec<u64>,
    chunks: BTreeMap<Vec<u64>, ChunkPoints>,
}

impl CoordinateIndexer {
    /// Create a new coordinate indexer from selection `items` holding one integer list per axis.
    ///
    /// # Errors
    /// Returns [`IndexerError`] if an item is not an integer list, the lists have unequal lengths, or an index is out of bounds.
    pub fn new_coordinate(
        array_shape: &[u64],
        chunk_shape: &[NonZeroU64],
        items: &[SelectionItem],
    ) -> Result<Self, IndexerError> {
        let lists = items
            .iter()
            .map(|item| match item {
                SelectionItem::Indices(indices) => Ok(indices),
                item => Err(IndexerError::UnsupportedItem {
                    kind: IndexerKind::Coordinate,
                    item: format!("{item:?}"),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if lists.len() != array_shape.len() || lists.is_empty() {
            return Err(IndexerError::IncompatibleDimensionality(
                lists.len(),
                array_shape.len(),
            ));
        }
        if !lists.iter().map(|list| list.len()).all_equal() {
            return Err(IndexerError::UnequalCoordinateLengths(
                lists.iter().map(|list| list.len()).collect(),
            ));
        }
        let num_points = lists[0].len();
        let points = (0..num_points).map(|point| {
            lists
                .iter()
                .zip(array_shape)
                .enumerate()
                .map(|(axis, (list, &extent))| normalise_index(list[point], axis, extent))
                .collect::<Result<Vec<_>, _>>()
        });
        Self::from_points(IndexerKind::Coordinate, chunk_shape, num_points, points)
    }

    /// Create a new mask indexer from selection `items` holding a single boolean mask with the shape of the array.
    ///
    /// # Errors
    /// Returns [`IndexerError`] if the item is not a boolean mask or its shape does not match the array.
    pub fn new_mask(
        array_shape: &[u64],
        chunk_shape: &[NonZeroU64],
        items: &[SelectionItem],
    ) -> Result<Self, IndexerError> {
        let [
            SelectionItem::Mask {
                values,
                shape: mask_shape,
            },
        ] = items
        else {
            return Err(IndexerError::UnsupportedItem {
                kind: IndexerKind::Mask,
                item: format!("{items:?}"),
            });
        };
        if mask_shape.as_slice() != array_shape {
            return Err(IndexerError::MaskShapeMismatch(
                mask_shape.clone(),
                array_shape.to_vec(),
            ));
        }
        let strides = c_strides(array_shape);
        let selected = values.iter().positions(|&selected| selected).collect_vec();
        let points = selected.iter().map(|&linear| {
            let linear = linear as u64;
            Ok(strides
                .iter()
                .zip(array_shape)
                .map(|(stride, extent)| linear / stride % extent)
                .collect())
        });
        Self::from_points(IndexerKind::Mask, chunk_shape, selected.len(), points)
    }

    fn from_points(
        kind: IndexerKind,
        chunk_shape: &[NonZeroU64],
        num_points: usize,
        points: impl Iterator<Item = Result<Vec<u64>, IndexerError>>,
    ) -> Result<Self, IndexerError> {
        let mut chunks: BTreeMap<Vec<u64>, ChunkPoints> = BTreeMap::new();
        for (position, point) in points.enumerate() {
            let point = point?;
            let (chunk_coords, chunk_point): (Vec<u64>, Vec<u64>) = point
                .iter()
                .zip(chunk_shape)
                .map(|(index, chunk_size)| (index / chunk_size.get(), index % chunk_size.get()))
                .unzip();
            let chunk = chunks.entry(chunk_coords).or_default();
            chunk.points.push(chunk_point);
            chunk.positions.push(position as u64);
        }
        Ok(Self {
            kind,
            shape: vec![num_points as u64],
            chunks,
        })
    }
}

impl ChunkIndexerTraits for CoordinateIndexer {
    fn kind(&self) -> IndexerKind {
        self.kind
    }

    fn shape(&self) -> &[u64] {
        &self.shape
    }

    fn buffer_shape(&self) -> &[u64] {
        &self.shape
    }

    fn chunk_tasks(&self) -> Box<dyn Iterator<Item = ChunkTask> + Send + '_> {
        Box::new(self.chunks.iter().map(|(chunk_coords, chunk)| {
            ChunkTask::new(
                chunk_coords.clone(),
                ChunkSelection::Points(chunk.points.clone()),
                OutputSelection::Positions(chunk.positions.clone()),
            )
        }))
    }
}
