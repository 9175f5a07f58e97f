#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use futures::TryStreamExt;

use azarr::array::codec::CodecError;
use azarr::array::{Array, ArrayBuffer, ArrayError, ArrayErrorKind, ArrayMetadataV2, ArrayOptions};
use azarr::indexer::{IndexerError, Selection, SelectionItem, Slice};
use azarr::storage::store::MemoryStore;
use azarr::storage::{AsyncWritableStorageTraits, Bytes};
use azarr::storage::storage_adapter::performance_metrics::PerformanceMetricsStorageAdapter;

use common::{FailingReadsStorageAdapter, ShuffledReadsStorageAdapter};

fn metadata(shape: &[u64], chunks: &[u64], dtype: &str, fill_value: &str) -> ArrayMetadataV2 {
    serde_json::from_str(&format!(
        r#"{{"zarr_format": 2, "shape": {shape:?}, "chunks": {chunks:?}, "dtype": "{dtype}",
            "compressor": {{"id": "gzip", "level": 1}}, "fill_value": {fill_value},
            "order": "C", "filters": null}}"#
    ))
    .unwrap()
}

/// A 3x3 `<i4` array with chunks of 2x2 and elements `0..9` in C order.
async fn array_3x3<TStorage>(
    storage: Arc<TStorage>,
) -> Result<Array<TStorage>, Box<dyn std::error::Error>>
where
    TStorage: ?Sized
        + azarr::storage::AsyncReadableStorageTraits
        + azarr::storage::AsyncWritableStorageTraits,
{
    let array = Array::new_with_metadata(storage, "/a", metadata(&[3, 3], &[2, 2], "<i4", "-1"))?;
    array.async_store_metadata().await?;
    let elements: Vec<i32> = (0..9).collect();
    array
        .async_set_orthogonal_selection(
            &Selection::all(),
            &ArrayBuffer::from_elements(array.data_type().clone(), vec![3, 3], &elements)?,
        )
        .await?;
    Ok(array)
}

#[tokio::test]
async fn array_async_all_missing() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = Array::new_with_metadata(
        store.clone(),
        "/filled",
        metadata(&[5, 4], &[2, 3], "<f4", "\"NaN\""),
    )?;
    let values = array
        .async_get(&Selection::new(vec![(1..4).into(), SelectionItem::Index(-1)]))
        .await?;
    assert_eq!(values.shape(), &[3]);
    assert!(values.to_elements::<f32>()?.iter().all(|value| value.is_nan()));

    let array = Array::new_with_metadata(store, "/zeroed", metadata(&[5, 4], &[2, 3], ">u2", "null"))?;
    let values = array
        .async_get(&Selection::new(vec![
            SelectionItem::Slice(Slice::full().with_step(2)),
            (..2).into(),
        ]))
        .await?;
    assert_eq!(values.shape(), &[3, 2]);
    assert_eq!(values.to_elements::<u16>()?, vec![0; 6]);
    Ok(())
}

#[tokio::test]
async fn array_async_chunk_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = Array::new_with_metadata(store.clone(), "/a", metadata(&[4, 4], &[2, 2], ">i8", "0"))?;
    let elements = [i64::MIN, -1, 1, i64::MAX];
    array.async_store_chunk_elements(&[1, 1], &elements).await?;
    let encoded = array.async_retrieve_encoded_chunk(&[1, 1]).await?.unwrap();
    assert_eq!(&encoded[..2], &[0x1f, 0x8b]);
    assert_eq!(
        array.async_retrieve_chunk(&[1, 1]).await?.to_elements::<i64>()?,
        elements
    );
    assert_eq!(
        array
            .async_get(&Selection::new(vec![(2..).into(), (2..).into()]))
            .await?
            .to_elements::<i64>()?,
        elements
    );
    Ok(())
}

#[tokio::test]
async fn array_async_orthogonal_rows() -> Result<(), Box<dyn std::error::Error>> {
    let array = array_3x3(Arc::new(MemoryStore::new())).await?;
    let all = array.async_retrieve_all().await?.to_elements::<i32>()?;
    let rows = array
        .async_get_orthogonal_selection(&Selection::new(vec![
            SelectionItem::Indices(vec![0, 2]),
            (..).into(),
        ]))
        .await?;
    assert_eq!(rows.shape(), &[2, 3]);
    assert_eq!(
        rows.to_elements::<i32>()?,
        [&all[0..3], &all[6..9]].concat()
    );

    // unsorted and repeated indices keep their order
    let columns = array
        .async_get(&Selection::new(vec![
            (..).into(),
            SelectionItem::Indices(vec![2, 0, 2]),
        ]))
        .await?;
    assert_eq!(columns.shape(), &[3, 3]);
    assert_eq!(
        columns.to_elements::<i32>()?,
        vec![2, 0, 2, 5, 3, 5, 8, 6, 8]
    );

    let masked = array
        .async_get(&Selection::new(vec![
            SelectionItem::mask(vec![false, true, true]),
            1.into(),
        ]))
        .await?;
    assert_eq!(masked.to_elements::<i32>()?, vec![4, 7]);
    Ok(())
}

#[tokio::test]
async fn array_async_coordinate_and_mask() -> Result<(), Box<dyn std::error::Error>> {
    let array = array_3x3(Arc::new(MemoryStore::new())).await?;
    let points = array
        .async_get_coordinate_selection(&Selection::new(vec![
            SelectionItem::Indices(vec![0, 1]),
            SelectionItem::Indices(vec![1, 2]),
        ]))
        .await?;
    assert_eq!(points.shape(), &[2]);
    assert_eq!(points.to_elements::<i32>()?, vec![1, 5]);

    let store = Arc::new(MemoryStore::new());
    let array = Array::new_with_metadata(store, "/m", metadata(&[2, 2], &[1, 2], "<u1", "0"))?;
    array.async_store_chunk_elements(&[0, 0], &[10u8, 11]).await?;
    array.async_store_chunk_elements(&[1, 0], &[12u8, 13]).await?;
    let mask = Selection::new(vec![SelectionItem::mask_nd(
        vec![true, false, false, true],
        vec![2, 2],
    )?]);
    let masked = array.async_get_mask_selection(&mask).await?;
    let coordinates = array
        .async_get_coordinate_selection(&Selection::new(vec![
            SelectionItem::Indices(vec![0, 1]),
            SelectionItem::Indices(vec![0, 1]),
        ]))
        .await?;
    assert_eq!(masked, coordinates);
    assert_eq!(masked.to_elements::<u8>()?, vec![10, 13]);
    // a full-shape mask is dispatched as a mask selection
    assert_eq!(array.async_get(&mask).await?, masked);

    assert!(matches!(
        array
            .async_get_coordinate_selection(&Selection::new(vec![
                SelectionItem::Indices(vec![0, 1]),
                SelectionItem::Indices(vec![0]),
            ]))
            .await,
        Err(ArrayError::IndexerError(IndexerError::UnequalCoordinateLengths(_)))
    ));
    Ok(())
}

#[tokio::test]
async fn array_async_invalid_selection_reads_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(PerformanceMetricsStorageAdapter::new(Arc::new(
        MemoryStore::new(),
    )));
    let array = array_3x3(store.clone()).await?;
    store.reset();

    let err = array
        .async_get(&Selection::new(vec![0.into(), 0.into(), 0.into()]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ArrayError::IndexerError(IndexerError::TooManyIndices(3, 2))
    ));
    assert_eq!(err.kind(), ArrayErrorKind::Selection);

    let err = array
        .async_get(&Selection::new(vec![(..).into(), SelectionItem::Indices(vec![0, 3])]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ArrayError::IndexerError(IndexerError::OutOfBounds { index: 3, axis: 1, extent: 3 })
    ));
    assert!(
        array
            .async_get(&Selection::new(vec![SelectionItem::Slice(
                Slice::full().with_step(0)
            )]))
            .await
            .is_err()
    );
    assert_eq!(store.reads(), 0);
    Ok(())
}

#[tokio::test]
async fn array_async_get_into() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = Array::new_with_metadata(store.clone(), "/a", metadata(&[3, 3], &[2, 2], "<i4", "null"))?;
    array.async_store_chunk_elements(&[0, 0], &[1i32, 2, 3, 4]).await?;

    // missing chunks leave the output untouched without a fill value
    let mut output = ArrayBuffer::from_elements(array.data_type().clone(), vec![3, 3], &[-7i32; 9])?;
    array.async_get_into(&Selection::all(), &mut output).await?;
    assert_eq!(
        output.to_elements::<i32>()?,
        vec![1, 2, -7, 3, 4, -7, -7, -7, -7]
    );

    let array = Array::new_with_metadata(store, "/b", metadata(&[3, 3], &[2, 2], "<i4", "0"))?;
    array.async_store_chunk_elements(&[1, 0], &[5i32, 6, 7, 8]).await?;
    let mut output = ArrayBuffer::from_elements(array.data_type().clone(), vec![2], &[-7i32; 2])?;
    array
        .async_get_coordinate_selection_into(
            &Selection::new(vec![
                SelectionItem::Indices(vec![2, 0]),
                SelectionItem::Indices(vec![1, 2]),
            ]),
            &mut output,
        )
        .await?;
    assert_eq!(output.to_elements::<i32>()?, vec![6, 0]);

    let mut output = ArrayBuffer::from_elements(array.data_type().clone(), vec![3], &[0i32; 3])?;
    let err = array
        .async_get_into(&Selection::new(vec![(..2).into()]), &mut output)
        .await
        .unwrap_err();
    assert!(matches!(err, ArrayError::InvalidDataShape(_, _)));
    assert_eq!(err.kind(), ArrayErrorKind::Selection);

    let mut output = ArrayBuffer::from_elements(array.data_type().clone(), vec![3, 3], &[0i32; 9])?;
    let err = array
        .async_get_into(&Selection::all().with_fields(["f0"]), &mut output)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ArrayErrorKind::Selection);
    Ok(())
}

#[tokio::test]
async fn array_async_undecodable_chunk() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = array_3x3(store.clone()).await?;
    store
        .set(&array.chunk_key(&[1, 1]), Bytes::from_static(b"garbage"))
        .await?;
    let err = array.async_retrieve_all().await.unwrap_err();
    assert!(matches!(err, ArrayError::CodecError(_)));
    assert_eq!(err.kind(), ArrayErrorKind::Decode);

    // chunks other than the corrupt one still read
    assert_eq!(
        array
            .async_get(&Selection::new(vec![(..2).into(), (..2).into()]))
            .await?
            .to_elements::<i32>()?,
        vec![0, 1, 3, 4]
    );

    let uncompressed: ArrayMetadataV2 = serde_json::from_str(
        r#"{"zarr_format": 2, "shape": [4, 4], "chunks": [2, 2], "dtype": "<i4",
            "compressor": null, "fill_value": 0, "order": "C", "filters": null}"#,
    )?;
    let array = Array::new_with_metadata(store.clone(), "/raw", uncompressed)?;
    store
        .set(&array.chunk_key(&[0, 1]), Bytes::from_static(&[1, 2, 3]))
        .await?;
    let err = array
        .async_get(&Selection::new(vec![SelectionItem::Index(0)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ArrayError::CodecError(CodecError::UnexpectedChunkDecodedSize(3, 16))
    ));
    assert_eq!(err.kind(), ArrayErrorKind::Decode);
    Ok(())
}

#[tokio::test]
async fn array_async_storage_error() -> Result<(), Box<dyn std::error::Error>> {
    let memory = Arc::new(MemoryStore::new());
    let array = array_3x3(memory.clone()).await?;
    let failing_key = array.chunk_key(&[0, 1]);
    let array = Array::new_with_metadata(
        Arc::new(FailingReadsStorageAdapter::new(memory, failing_key)),
        "/a",
        metadata(&[3, 3], &[2, 2], "<i4", "-1"),
    )?;

    let err = array.async_retrieve_all().await.unwrap_err();
    assert!(matches!(err, ArrayError::StorageError(_)));
    assert_eq!(err.kind(), ArrayErrorKind::Storage);

    let mut output = ArrayBuffer::from_elements(array.data_type().clone(), vec![3], &[0i32; 3])?;
    let err = array
        .async_get_into(&Selection::new(vec![SelectionItem::Index(1)]), &mut output)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ArrayErrorKind::Storage);

    // selections avoiding the failing chunk still read
    assert_eq!(
        array
            .async_get(&Selection::new(vec![(..).into(), SelectionItem::Index(0)]))
            .await?
            .to_elements::<i32>()?,
        vec![0, 3, 6]
    );
    Ok(())
}

#[tokio::test]
async fn array_async_completion_order() -> Result<(), Box<dyn std::error::Error>> {
    let memory = Arc::new(MemoryStore::new());
    let array = Array::new_with_metadata(memory.clone(), "/a", metadata(&[17, 13], &[3, 4], "<u4", "7"))?;
    array.async_store_metadata().await?;
    let elements: Vec<u32> = (0..17 * 13).collect();
    array
        .async_set_orthogonal_selection(
            &Selection::all(),
            &ArrayBuffer::from_elements(array.data_type().clone(), vec![17, 13], &elements)?,
        )
        .await?;
    array.async_erase_chunk(&[2, 1]).await?;

    let selections = [
        Selection::all(),
        Selection::new(vec![SelectionItem::Slice(Slice::new(Some(1), Some(-1), Some(3)))]),
        Selection::new(vec![
            SelectionItem::Indices(vec![16, 0, 8, 7]),
            SelectionItem::Indices(vec![12, 0, 5, 6]),
        ]),
    ];
    let sequential = Array::async_open(memory.clone(), "/a")
        .await?
        .with_options(ArrayOptions::default().with_concurrent_limit(Some(1)));
    for seed in 0..4 {
        let shuffled = Array::async_open(
            Arc::new(ShuffledReadsStorageAdapter::new(memory.clone(), seed)),
            "/a",
        )
        .await?;
        for selection in &selections {
            assert_eq!(
                shuffled.async_get(selection).await?,
                sequential.async_get(selection).await?
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn array_async_structured_fields() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let metadata: ArrayMetadataV2 = serde_json::from_str(
        r#"{"zarr_format": 2, "shape": [3], "chunks": [2], "dtype": [["a", "<i2"], ["b", ">f4"]],
            "compressor": null, "fill_value": null, "order": "C", "filters": null}"#,
    )?;
    let array = Array::new_with_metadata(store, "/s", metadata)?;
    assert_eq!(array.data_type().size(), 6);

    // [(1, 0.5), (2, -1.0)] in native byte order
    let mut chunk = Vec::new();
    for (a, b) in [(1i16, 0.5f32), (2, -1.0)] {
        chunk.extend_from_slice(&a.to_ne_bytes());
        chunk.extend_from_slice(&b.to_ne_bytes());
    }
    array
        .async_store_chunk(
            &[0],
            &ArrayBuffer::new(array.data_type().clone(), vec![2], chunk)?,
        )
        .await?;

    let b = array
        .async_get(&Selection::all().with_fields(["b"]))
        .await?;
    assert_eq!(b.to_elements::<f32>()?, vec![0.5, -1.0, 0.0]);
    let a = array
        .async_get(&Selection::new(vec![1.into()]).with_fields(["a"]))
        .await?;
    assert!(a.is_scalar());
    assert_eq!(a.to_elements::<i16>()?, vec![2]);
    assert!(matches!(
        array.async_get(&Selection::all().with_fields(["c"])).await,
        Err(ArrayError::IndexerError(IndexerError::InvalidFields(_)))
    ));
    Ok(())
}

#[tokio::test]
async fn array_async_iter_slabs() -> Result<(), Box<dyn std::error::Error>> {
    let array = array_3x3(Arc::new(MemoryStore::new())).await?;
    let rows: Vec<Vec<i32>> = array
        .iter_slabs(0, 3)?
        .and_then(|row| async move { row.to_elements::<i32>() })
        .try_collect()
        .await?;
    assert_eq!(rows, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]]);
    Ok(())
}

#[cfg(feature = "ndarray")]
#[tokio::test]
async fn array_async_ndarray() -> Result<(), Box<dyn std::error::Error>> {
    let array = array_3x3(Arc::new(MemoryStore::new())).await?;
    let values = array
        .async_get(&Selection::new(vec![(1..).into(), (..2).into()]))
        .await?
        .to_ndarray::<i32>()?;
    assert_eq!(values, ndarray::array![[3, 4], [6, 7]].into_dyn());
    Ok(())
}
