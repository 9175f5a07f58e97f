//! Tests for chunk indexers.
#![allow(missing_docs)]

use std::num::NonZeroU64;

use itertools::Itertools;

use azarr::indexer::{
    ChunkIndexerTraits, IndexerError, IndexerKind, Selection, SelectionItem, Slice, infer_kind,
    is_pure_fancy_indexing, resolve,
};

fn chunk_shape(chunk_shape: &[u64]) -> Vec<NonZeroU64> {
    chunk_shape
        .iter()
        .map(|&size| NonZeroU64::new(size).unwrap())
        .collect()
}

/// Gather a selection of an array whose elements are their own C order linear index.
fn gather_linear(indexer: &dyn ChunkIndexerTraits, shape: &[u64], chunk_shape: &[u64]) -> Vec<u64> {
    let mut output = vec![u64::MAX; usize::try_from(indexer.num_elements()).unwrap()];
    for task in indexer.chunk_tasks() {
        task.for_each_run(chunk_shape, indexer.buffer_shape(), |chunk_offset, output_offset, len| {
            for i in 0..len {
                // unravel the chunk offset, then ravel the array index
                let mut remainder = chunk_offset + i;
                let mut chunk_index = vec![0; chunk_shape.len()];
                for axis in (0..chunk_shape.len()).rev() {
                    chunk_index[axis] = remainder % chunk_shape[axis];
                    remainder /= chunk_shape[axis];
                }
                let linear = task
                    .chunk_coords()
                    .iter()
                    .zip(chunk_index)
                    .zip(chunk_shape.iter().zip(shape))
                    .fold(0, |linear, ((coord, index), (size, extent))| {
                        linear * extent + coord * size + index
                    });
                output[usize::try_from(output_offset + i).unwrap()] = linear;
            }
        });
    }
    output
}

#[test]
fn indexer_basic_matches_strides() {
    let shape = [7, 5, 3];
    let chunks = [2, 3, 2];
    let selection = Selection::new(vec![
        SelectionItem::Slice(Slice::new(Some(1), None, Some(2))),
        SelectionItem::Index(-2),
        (..).into(),
    ]);
    let indexer = resolve(&shape, &chunk_shape(&chunks), &selection, IndexerKind::Basic).unwrap();
    assert_eq!(indexer.shape(), &[3, 3]);
    assert_eq!(indexer.buffer_shape(), &[3, 1, 3]);
    let expected = [1u64, 3, 5]
        .iter()
        .cartesian_product(0..3u64)
        .map(|(&i, k)| i * 15 + 3 * 3 + k)
        .collect_vec();
    assert_eq!(gather_linear(indexer.as_ref(), &shape, &chunks), expected);

    // chunks are enumerated in C order
    let coords = indexer
        .chunk_tasks()
        .map(|task| task.chunk_coords().to_vec())
        .collect_vec();
    assert_eq!(
        coords,
        vec![
            vec![0, 1, 0],
            vec![0, 1, 1],
            vec![1, 1, 0],
            vec![1, 1, 1],
            vec![2, 1, 0],
            vec![2, 1, 1],
        ]
    );
}

#[test]
fn indexer_orthogonal_unsorted() {
    let shape = [4, 6];
    let chunks = [3, 4];
    let selection = Selection::new(vec![
        SelectionItem::Indices(vec![3, -4, 2]),
        SelectionItem::mask(vec![true, false, false, false, true, true]),
    ]);
    let indexer = resolve(
        &shape,
        &chunk_shape(&chunks),
        &selection,
        IndexerKind::Orthogonal,
    )
    .unwrap();
    assert_eq!(indexer.shape(), &[3, 3]);
    let expected = [3u64, 0, 2]
        .iter()
        .cartesian_product([0u64, 4, 5])
        .map(|(&i, j)| i * 6 + j)
        .collect_vec();
    assert_eq!(gather_linear(indexer.as_ref(), &shape, &chunks), expected);
    assert_eq!(indexer.chunk_tasks().count(), 4);
}

#[test]
fn indexer_coordinate_and_mask() {
    let shape = [5, 5];
    let chunks = [2, 2];
    let coordinate = resolve(
        &shape,
        &chunk_shape(&chunks),
        &Selection::new(vec![
            SelectionItem::Indices(vec![4, 0, 4, 1]),
            SelectionItem::Indices(vec![4, 0, -2, 1]),
        ]),
        IndexerKind::Coordinate,
    )
    .unwrap();
    assert_eq!(coordinate.shape(), &[4]);
    assert_eq!(
        gather_linear(coordinate.as_ref(), &shape, &chunks),
        vec![24, 0, 23, 6]
    );
    // one task per distinct chunk
    assert_eq!(coordinate.chunk_tasks().count(), 3);

    let values = (0..25).map(|i| i % 7 == 0).collect_vec();
    let mask = resolve(
        &shape,
        &chunk_shape(&chunks),
        &Selection::new(vec![SelectionItem::mask_nd(values, vec![5, 5]).unwrap()]),
        IndexerKind::Mask,
    )
    .unwrap();
    assert_eq!(
        gather_linear(mask.as_ref(), &shape, &chunks),
        vec![0, 7, 14, 21]
    );
}

#[test]
fn indexer_empty_selection() {
    let indexer = resolve(
        &[4, 4],
        &chunk_shape(&[2, 2]),
        &Selection::new(vec![(3..1).into()]),
        IndexerKind::Basic,
    )
    .unwrap();
    assert_eq!(indexer.shape(), &[0, 4]);
    assert_eq!(indexer.num_elements(), 0);
    assert!(gather_linear(indexer.as_ref(), &[4, 4], &[2, 2]).is_empty());
}

#[test]
fn indexer_errors() {
    let shape = [3, 3];
    let chunks = chunk_shape(&[2, 2]);
    let resolve_err = |selection: Vec<SelectionItem>, kind| {
        resolve(&shape, &chunks, &Selection::new(selection), kind)
            .err()
            .unwrap()
    };
    assert!(matches!(
        resolve_err(vec![0.into(), 0.into(), 0.into()], IndexerKind::Basic),
        IndexerError::TooManyIndices(3, 2)
    ));
    assert!(matches!(
        resolve_err(
            vec![SelectionItem::Ellipsis, 0.into(), SelectionItem::Ellipsis],
            IndexerKind::Basic
        ),
        IndexerError::MultipleEllipsis
    ));
    assert!(matches!(
        resolve_err(vec![(-4).into()], IndexerKind::Basic),
        IndexerError::OutOfBounds { index: -4, axis: 0, extent: 3 }
    ));
    assert!(matches!(
        resolve_err(vec![SelectionItem::Indices(vec![0])], IndexerKind::Basic),
        IndexerError::UnsupportedItem { kind: IndexerKind::Basic, .. }
    ));
    assert!(matches!(
        resolve_err(vec![SelectionItem::mask(vec![true; 2])], IndexerKind::Orthogonal),
        IndexerError::MaskShapeMismatch(..)
    ));
    assert!(matches!(
        resolve_err(
            vec![SelectionItem::mask_nd(vec![true; 4], vec![2, 2]).unwrap()],
            IndexerKind::Mask
        ),
        IndexerError::MaskShapeMismatch(..)
    ));
    assert!(matches!(
        resolve(&shape, &chunk_shape(&[2]), &Selection::all(), IndexerKind::Basic),
        Err(IndexerError::IncompatibleDimensionality(1, 2))
    ));
}

#[test]
fn indexer_kind_dispatch() {
    let indices = || SelectionItem::Indices(vec![0, 1]);
    let selection = Selection::new;
    assert_eq!(infer_kind(&selection(vec![0.into(), (..).into()]), 2), IndexerKind::Basic);
    assert_eq!(infer_kind(&selection(vec![indices(), (..).into()]), 2), IndexerKind::Orthogonal);
    assert_eq!(infer_kind(&selection(vec![indices(), indices()]), 2), IndexerKind::Coordinate);
    assert_eq!(infer_kind(&selection(vec![indices()]), 2), IndexerKind::Orthogonal);
    assert_eq!(
        infer_kind(
            &selection(vec![SelectionItem::mask_nd(vec![true; 4], vec![2, 2]).unwrap()]),
            2
        ),
        IndexerKind::Mask
    );
    assert_eq!(
        infer_kind(&selection(vec![SelectionItem::mask(vec![true, false])]), 2),
        IndexerKind::Orthogonal
    );
    assert_eq!(infer_kind(&selection(vec![SelectionItem::mask(vec![true, false])]), 1), IndexerKind::Mask);
    assert!(!is_pure_fancy_indexing(&Selection::all(), 0));
}
