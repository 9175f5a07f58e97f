use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use itertools::Itertools;

use super::IndexerError;

/// A slice along an axis with optional `start`, `stop` and `step`.
///
/// Bounds follow `NumPy` semantics: negative bounds count from the end of the axis and out of bounds bounds are clamped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Slice {
    /// The first index, defaults to `0`.
    pub start: Option<i64>,
    /// The exclusive end index, defaults to the axis extent.
    pub stop: Option<i64>,
    /// The step, defaults to `1`. Must be positive.
    pub step: Option<i64>,
}

impl Slice {
    /// A slice over a whole axis.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            start: None,
            stop: None,
            step: None,
        }
    }

    /// Create a new slice.
    #[must_use]
    pub const fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    /// Set the step.
    #[must_use]
    pub const fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    /// Resolve the slice against an axis of `extent`, returning `(start, step, len)`.
    ///
    /// # Errors
    /// Returns [`IndexerError::InvalidSliceStep`] if the step is not positive.
    pub fn indices(&self, extent: u64) -> Result<(u64, u64, u64), IndexerError> {
        let step = self.step.unwrap_or(1);
        if step <= 0 {
            return Err(IndexerError::InvalidSliceStep(step));
        }
        let extent_i = i64::try_from(extent).unwrap_or(i64::MAX);
        let clamp = |bound: i64| {
            let bound = if bound < 0 { bound + extent_i } else { bound };
            bound.clamp(0, extent_i)
        };
        let start = self.start.map_or(0, clamp);
        let stop = self.stop.map_or(extent_i, clamp);
        let len = if stop > start {
            (stop - start - 1) / step + 1
        } else {
            0
        };
        #[expect(clippy::cast_sign_loss)]
        let indices = (start as u64, step as u64, len as u64);
        Ok(indices)
    }
}

/// An item of a [`Selection`], selecting along one axis (or every axis for a multidimensional mask).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionItem {
    /// A single index, negative indices count from the end. The axis is dropped from the output.
    Index(i64),
    /// A slice.
    Slice(Slice),
    /// A list of indices, in any order and possibly repeated.
    Indices(Vec<i64>),
    /// A boolean mask with `shape`, in C order.
    ///
    /// A one dimensional mask selects along a single axis.
    /// A mask with the shape of the array selects individual elements.
    Mask {
        /// The mask values.
        values: Vec<bool>,
        /// The mask shape.
        shape: Vec<u64>,
    },
    /// Full slices over as many axes as needed to match the array dimensionality.
    Ellipsis,
}

impl SelectionItem {
    /// A slice over a whole axis.
    #[must_use]
    pub const fn full() -> Self {
        Self::Slice(Slice::full())
    }

    /// A one dimensional boolean mask.
    #[must_use]
    pub fn mask(values: Vec<bool>) -> Self {
        let shape = vec![values.len() as u64];
        Self::Mask { values, shape }
    }

    /// A multidimensional boolean mask with values in C order.
    ///
    /// # Errors
    /// Returns [`IndexerError::MaskShapeMismatch`] if the number of values does not match `shape`.
    pub fn mask_nd(values: Vec<bool>, shape: Vec<u64>) -> Result<Self, IndexerError> {
        if values.len() as u64 == shape.iter().product::<u64>() {
            Ok(Self::Mask { values, shape })
        } else {
            Err(IndexerError::MaskShapeMismatch(
                vec![values.len() as u64],
                shape,
            ))
        }
    }

    /// The number of array axes the item consumes.
    fn num_axes(&self) -> usize {
        match self {
            Self::Mask { shape, .. } => shape.len(),
            Self::Ellipsis => 0,
            _ => 1,
        }
    }

    /// Returns true for integer lists and masks.
    #[must_use]
    pub const fn is_fancy(&self) -> bool {
        matches!(self, Self::Indices(_) | Self::Mask { .. })
    }
}

impl From<i64> for SelectionItem {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<Slice> for SelectionItem {
    fn from(slice: Slice) -> Self {
        Self::Slice(slice)
    }
}

impl From<Range<i64>> for SelectionItem {
    fn from(range: Range<i64>) -> Self {
        Self::Slice(Slice::new(Some(range.start), Some(range.end), None))
    }
}

impl From<RangeFrom<i64>> for SelectionItem {
    fn from(range: RangeFrom<i64>) -> Self {
        Self::Slice(Slice::new(Some(range.start), None, None))
    }
}

impl From<RangeTo<i64>> for SelectionItem {
    fn from(range: RangeTo<i64>) -> Self {
        Self::Slice(Slice::new(None, Some(range.end), None))
    }
}

impl From<RangeFull> for SelectionItem {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

impl From<Vec<i64>> for SelectionItem {
    fn from(indices: Vec<i64>) -> Self {
        Self::Indices(indices)
    }
}

impl From<Vec<bool>> for SelectionItem {
    fn from(values: Vec<bool>) -> Self {
        Self::mask(values)
    }
}

/// A selection: a sequence of [`SelectionItem`]s and an optional list of fields of a structured data type.
///
/// Missing trailing items select whole axes, so an empty selection selects the entire array.
///
/// ```rust
/// # use azarr::indexer::{Selection, SelectionItem};
/// // arr[0, 2:5, ...]
/// let selection = Selection::new(vec![0.into(), (2..5).into(), SelectionItem::Ellipsis]);
/// // arr[[0, 2], :]["a"]
/// let selection = Selection::new(vec![vec![0, 2].into(), (..).into()]).with_fields(["a"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    items: Vec<SelectionItem>,
    fields: Vec<String>,
}

impl Selection {
    /// Create a new selection from `items`.
    #[must_use]
    pub fn new(items: Vec<SelectionItem>) -> Self {
        Self {
            items,
            fields: Vec::new(),
        }
    }

    /// A selection of the entire array.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Select `fields` of a structured data type.
    #[must_use]
    pub fn with_fields<I: IntoIterator<Item = S>, S: Into<String>>(mut self, fields: I) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// The selection items.
    #[must_use]
    pub fn items(&self) -> &[SelectionItem] {
        &self.items
    }

    /// The selected fields. Empty if the selection has no field filter.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Expand the ellipsis (if any) and append full slices so that the items cover `rank` axes.
    ///
    /// # Errors
    /// Returns [`IndexerError`] if there is more than one ellipsis or the items cover more than `rank` axes.
    pub fn expand(&self, rank: usize) -> Result<Vec<SelectionItem>, IndexerError> {
        let num_ellipsis = self
            .items
            .iter()
            .filter(|item| matches!(item, SelectionItem::Ellipsis))
            .count();
        if num_ellipsis > 1 {
            return Err(IndexerError::MultipleEllipsis);
        }
        let num_axes: usize = self.items.iter().map(SelectionItem::num_axes).sum();
        if num_axes > rank {
            return Err(IndexerError::TooManyIndices(num_axes, rank));
        }
        let fill = || std::iter::repeat_n(SelectionItem::full(), rank - num_axes);
        let items = if num_ellipsis == 1 {
            self.items
                .iter()
                .flat_map(|item| {
                    if matches!(item, SelectionItem::Ellipsis) {
                        fill().collect_vec()
                    } else {
                        vec![item.clone()]
                    }
                })
                .collect_vec()
        } else {
            self.items.iter().cloned().chain(fill()).collect_vec()
        };
        Ok(items)
    }
}

impl From<Vec<SelectionItem>> for Selection {
    fn from(items: Vec<SelectionItem>) -> Self {
        Self::new(items)
    }
}
