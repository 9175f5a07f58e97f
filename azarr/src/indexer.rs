//! Chunk indexers.
//!
//! An indexer translates a [`Selection`] of an array into a lazy sequence of [`ChunkTask`]s.
//! Each task identifies a chunk by its chunk coordinates and pairs a selection of elements within the chunk with the positions those elements occupy in the output.
//!
//! Four kinds of indexing are supported (see [`IndexerKind`]):
//!  - **basic**: integers, slices and an ellipsis,
//!  - **orthogonal**: basic items plus integer lists and one dimensional boolean masks, applied independently per axis,
//!  - **coordinate**: one integer list per axis, interpreted element-wise, and
//!  - **mask**: a boolean mask with the shape of the array.
//!
//! Selections are validated before any task is produced, so an invalid selection never reaches the store.
//!
//! Chunk tasks enumerate chunks in C order (the last chunk index varies fastest).

mod coordinate;
mod orthogonal;
mod selection;

use std::num::NonZeroU64;

use derive_more::Display;
use thiserror::Error;

pub use coordinate::CoordinateIndexer;
pub use orthogonal::OrthogonalIndexer;
pub use selection::{Selection, SelectionItem, Slice};

use crate::array::data_type::FieldSelectionError;

/// The kind of an indexer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum IndexerKind {
    /// Integers, slices and an ellipsis.
    #[display("basic")]
    Basic,
    /// Per axis integers, slices, integer lists and boolean masks.
    #[display("orthogonal")]
    Orthogonal,
    /// Element-wise integer lists.
    #[display("coordinate")]
    Coordinate,
    /// A boolean mask with the shape of the array.
    #[display("mask")]
    Mask,
}

/// An invalid selection.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum IndexerError {
    /// The selection covers more axes than the array has.
    #[error("too many indices for array: array is {1}-dimensional, but {0} were indexed")]
    TooManyIndices(usize, usize),
    /// The selection has more than one ellipsis.
    #[error("an index can only have a single ellipsis")]
    MultipleEllipsis,
    /// An index is out of bounds.
    #[error("index {index} is out of bounds for axis {axis} with size {extent}")]
    OutOfBounds {
        /// The index.
        index: i64,
        /// The axis.
        axis: usize,
        /// The extent of the axis.
        extent: u64,
    },
    /// A slice step is not positive.
    #[error("slice step {0} must be positive")]
    InvalidSliceStep(i64),
    /// Coordinate lists have different lengths.
    #[error("coordinate arrays have unequal lengths {0:?}")]
    UnequalCoordinateLengths(Vec<usize>),
    /// A boolean mask does not have the expected shape.
    #[error("boolean mask shape {0:?} does not match {1:?}")]
    MaskShapeMismatch(Vec<u64>, Vec<u64>),
    /// A selection item is not supported by an indexer kind.
    #[error("{kind} selection does not support {item}")]
    UnsupportedItem {
        /// The indexer kind.
        kind: IndexerKind,
        /// A description of the item.
        item: String,
    },
    /// The dimensionality of the array and its chunks differ.
    #[error("incompatible dimensionality {0}, expected {1}")]
    IncompatibleDimensionality(usize, usize),
    /// Invalid fields of a structured data type.
    #[error(transparent)]
    InvalidFields(#[from] FieldSelectionError),
}

/// A selection of indices along one axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DimSelection {
    /// `len` indices from `start` with `step`.
    Range {
        /// The first index.
        start: u64,
        /// The step.
        step: u64,
        /// The number of indices.
        len: u64,
    },
    /// Explicit indices.
    Indices(Vec<u64>),
}

impl DimSelection {
    /// Create a contiguous range of `len` indices from `start`.
    #[must_use]
    pub const fn contiguous(start: u64, len: u64) -> Self {
        Self::Range {
            start,
            step: 1,
            len,
        }
    }

    /// The number of indices.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Range { len, .. } => *len,
            Self::Indices(indices) => indices.len() as u64,
        }
    }

    /// Returns true if the selection has no indices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `i`th index.
    #[must_use]
    pub fn get(&self, i: u64) -> u64 {
        match self {
            Self::Range { start, step, .. } => start + i * step,
            #[expect(clippy::cast_possible_truncation)]
            Self::Indices(indices) => indices[i as usize],
        }
    }

    /// Returns the start of the selection if it is contiguous.
    #[must_use]
    pub const fn contiguous_start(&self) -> Option<u64> {
        match self {
            Self::Range {
                start, step: 1, ..
            } => Some(*start),
            _ => None,
        }
    }
}

/// The selection of elements within a chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkSelection {
    /// The outer product of per axis selections.
    Orthogonal(Vec<DimSelection>),
    /// Individual points.
    Points(Vec<Vec<u64>>),
}

/// The positions in the output of the elements of a [`ChunkSelection`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputSelection {
    /// The outer product of per axis selections of the output buffer.
    Orthogonal(Vec<DimSelection>),
    /// Linear positions in a one dimensional output.
    Positions(Vec<u64>),
}

/// A unit of work for a single chunk: its chunk coordinates, the selection within the chunk, and the matching output positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkTask {
    chunk_coords: Vec<u64>,
    chunk_selection: ChunkSelection,
    output_selection: OutputSelection,
}

fn c_strides(shape: &[u64]) -> Vec<u64> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

impl ChunkTask {
    /// Create a new chunk task.
    #[must_use]
    pub fn new(
        chunk_coords: Vec<u64>,
        chunk_selection: ChunkSelection,
        output_selection: OutputSelection,
    ) -> Self {
        Self {
            chunk_coords,
            chunk_selection,
            output_selection,
        }
    }

    /// The chunk coordinates.
    #[must_use]
    pub fn chunk_coords(&self) -> &[u64] {
        &self.chunk_coords
    }

    /// The selection within the chunk.
    #[must_use]
    pub const fn chunk_selection(&self) -> &ChunkSelection {
        &self.chunk_selection
    }

    /// The output positions of the selected elements.
    #[must_use]
    pub const fn output_selection(&self) -> &OutputSelection {
        &self.output_selection
    }

    /// The number of selected elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        match &self.output_selection {
            OutputSelection::Orthogonal(dims) => dims.iter().map(DimSelection::len).product(),
            OutputSelection::Positions(positions) => positions.len() as u64,
        }
    }

    /// Call `f(chunk_offset, output_offset, len)` for every run of `len` consecutive elements in both the chunk (of `chunk_shape`) and the output (of `output_shape`).
    ///
    /// Offsets are in elements, in C order.
    pub fn for_each_run(
        &self,
        chunk_shape: &[u64],
        output_shape: &[u64],
        mut f: impl FnMut(u64, u64, u64),
    ) {
        match (&self.chunk_selection, &self.output_selection) {
            (ChunkSelection::Orthogonal(chunk_dims), OutputSelection::Orthogonal(output_dims)) => {
                if chunk_dims.iter().any(DimSelection::is_empty) {
                    return;
                }
                let chunk_strides = c_strides(chunk_shape);
                let output_strides = c_strides(output_shape);
                let rank = chunk_dims.len();
                let (outer_rank, run) = match (chunk_dims.last(), output_dims.last()) {
                    (Some(chunk_last), Some(output_last))
                        if chunk_last.contiguous_start().is_some()
                            && output_last.contiguous_start().is_some() =>
                    {
                        (rank - 1, chunk_last.len())
                    }
                    _ => (rank, 1),
                };
                let mut index = vec![0u64; outer_rank];
                loop {
                    let mut chunk_offset = 0;
                    let mut output_offset = 0;
                    for axis in 0..outer_rank {
                        chunk_offset += chunk_dims[axis].get(index[axis]) * chunk_strides[axis];
                        output_offset += output_dims[axis].get(index[axis]) * output_strides[axis];
                    }
                    if outer_rank < rank {
                        chunk_offset += chunk_dims[rank - 1].get(0);
                        output_offset += output_dims[rank - 1].get(0);
                    }
                    f(chunk_offset, output_offset, run);

                    // advance the outer index in C order
                    let mut axis = outer_rank;
                    loop {
                        if axis == 0 {
                            return;
                        }
                        axis -= 1;
                        index[axis] += 1;
                        if index[axis] < chunk_dims[axis].len() {
                            break;
                        }
                        index[axis] = 0;
                    }
                }
            }
            (ChunkSelection::Points(points), OutputSelection::Positions(positions)) => {
                let chunk_strides = c_strides(chunk_shape);
                for (point, &position) in points.iter().zip(positions) {
                    let chunk_offset = point
                        .iter()
                        .zip(&chunk_strides)
                        .map(|(index, stride)| index * stride)
                        .sum();
                    f(chunk_offset, position, 1);
                }
            }
            _ => unreachable!("chunk and output selections of a chunk task have the same kind"),
        }
    }
}

/// Traits for chunk indexers.
pub trait ChunkIndexerTraits: Send + Sync {
    /// The indexer kind.
    fn kind(&self) -> IndexerKind;

    /// The shape of the selection result.
    fn shape(&self) -> &[u64];

    /// The shape of the buffer that the output selections of chunk tasks refer to.
    ///
    /// This equals [`shape`](ChunkIndexerTraits::shape) with unit axes retained for integer indices, so it has the same C order layout.
    fn buffer_shape(&self) -> &[u64];

    /// The number of selected elements.
    fn num_elements(&self) -> u64 {
        self.buffer_shape().iter().product()
    }

    /// Returns a lazy iterator over the chunk tasks.
    ///
    /// Each call restarts the sequence.
    fn chunk_tasks(&self) -> Box<dyn Iterator<Item = ChunkTask> + Send + '_>;
}

/// Returns true if the selection should be resolved element-wise, i.e. it is a single boolean mask with `rank` dimensions or it has an integer list for every one of the `rank` axes.
#[must_use]
pub fn is_pure_fancy_indexing(selection: &Selection, rank: usize) -> bool {
    match selection.items() {
        [SelectionItem::Mask { shape, .. }] => shape.len() == rank,
        items => {
            rank > 0
                && items.len() == rank
                && items
                    .iter()
                    .all(|item| matches!(item, SelectionItem::Indices(_)))
        }
    }
}

/// Infer the [`IndexerKind`] of a selection of an array with `rank` dimensions.
///
/// Selections without integer lists or masks are basic.
/// Pure fancy selections (see [`is_pure_fancy_indexing`]) are coordinate or mask selections.
/// Other selections with integer lists or masks are orthogonal.
#[must_use]
pub fn infer_kind(selection: &Selection, rank: usize) -> IndexerKind {
    if !selection.items().iter().any(SelectionItem::is_fancy) {
        IndexerKind::Basic
    } else if is_pure_fancy_indexing(selection, rank) {
        if matches!(selection.items(), [SelectionItem::Mask { .. }]) {
            IndexerKind::Mask
        } else {
            IndexerKind::Coordinate
        }
    } else {
        IndexerKind::Orthogonal
    }
}

/// Resolve a selection of an array with `shape` and `chunk_shape` into a chunk indexer of `kind`.
///
/// # Errors
/// Returns [`IndexerError`] if the selection is invalid for the array or not supported by `kind`.
pub fn resolve(
    shape: &[u64],
    chunk_shape: &[NonZeroU64],
    selection: &Selection,
    kind: IndexerKind,
) -> Result<Box<dyn ChunkIndexerTraits>, IndexerError> {
    if shape.len() != chunk_shape.len() {
        return Err(IndexerError::IncompatibleDimensionality(
            chunk_shape.len(),
            shape.len(),
        ));
    }
    let items = selection.expand(shape.len())?;
    Ok(match kind {
        IndexerKind::Basic | IndexerKind::Orthogonal => {
            Box::new(OrthogonalIndexer::new(shape, chunk_shape, &items, kind)?)
        }
        IndexerKind::Coordinate => {
            Box::new(CoordinateIndexer::new_coordinate(shape, chunk_shape, &items)?)
        }
        IndexerKind::Mask => Box::new(CoordinateIndexer::new_mask(shape, chunk_shape, &items)?),
    })
}

/// Normalise a possibly negative `index` along `axis` with `extent`.
fn normalise_index(index: i64, axis: usize, extent: u64) -> Result<u64, IndexerError> {
    let out_of_bounds = || IndexerError::OutOfBounds {
        index,
        axis,
        extent,
    };
    let normalised = if index < 0 {
        i128::from(extent) + i128::from(index)
    } else {
        i128::from(index)
    };
    if normalised >= 0 && normalised < i128::from(extent) {
        u64::try_from(normalised).map_err(|_| out_of_bounds())
    } else {
        Err(out_of_bounds())
    }
}
