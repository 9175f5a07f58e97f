//! `azarr` is an asynchronous Rust library for reading selections of chunked N-dimensional arrays in the [Zarr V2](https://zarr-specs.readthedocs.io/en/latest/v2/v2.0.html) storage format.
//!
//! An [`Array`](crate::array::Array) translates a selection (integers, slices, integer lists, boolean masks, an ellipsis and structured field names) into the chunks it touches.
//! Those chunks are fetched concurrently from a key-value store, decoded through the codec chain of the array, and assembled into a single [`ArrayBuffer`](crate::array::ArrayBuffer).
//! Chunks that do not exist read as the fill value of the array.
//!
//! Hierarchies with consolidated metadata (`.zmetadata`) can be opened with [`consolidated::open_consolidated`], which loads the metadata of every node with a single store request.
//!
//! ## Getting Started
//! - Stores implement the asynchronous storage traits of [`azarr_storage`], re-exported as [`storage`].
//!   An in-memory store is provided by [`MemoryStore`](crate::storage::store::MemoryStore).
//! - Metadata is modelled by [`azarr_metadata`], re-exported as [`metadata`].
//! - Selections are described in the [`indexer`] module.
//!
//! The async API is runtime-agnostic.
//! Chunk requests of a selection are multiplexed on the calling task; no threads are spawned.
//!
//! ### Supported Data
//! - Data types: `|b1`, signed and unsigned integers of 1, 2, 4 and 8 bytes, `f4`, `f8` (any byte order) and structured data types of these.
//! - Compressors and filters: `zlib` and `gzip` (see [`CodecRegistry`](crate::array::CodecRegistry) to register others).
//! - Memory order: `C` and `F`.
//! - Chunk key separators: `.` and `/`.
//!
//! ## Logging
//! `azarr` logs information and warnings using the [`log`] crate.
//! A logging implementation must be enabled to capture logs.
//! See the [`log`] crate documentation for more details.
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! use azarr::array::{Array, ArrayMetadataV2};
//! use azarr::indexer::{Selection, SelectionItem};
//! use azarr::storage::store::MemoryStore;
//!
//! # futures::executor::block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! let metadata: ArrayMetadataV2 = serde_json::from_str(
//!     r#"{"zarr_format": 2, "shape": [3, 4], "chunks": [2, 2], "dtype": "<i4",
//!         "compressor": null, "fill_value": -1, "order": "C", "filters": null}"#,
//! )?;
//! let array = Array::new_with_metadata(store.clone(), "/array", metadata)?;
//! array.async_store_metadata().await?;
//! array.async_store_chunk_elements::<i32>(&[0, 1], &[2, 3, 6, 7]).await?;
//!
//! let array = Array::async_open(store, "/array").await?;
//! let rows = array
//!     .async_get(&Selection::new(vec![SelectionItem::Indices(vec![0, 2]), (1..4).into()]))
//!     .await?;
//! assert_eq!(rows.shape(), &[2, 3]);
//! assert_eq!(rows.to_elements::<i32>()?, vec![-1, 2, 3, -1, -1, -1]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```
//!
//! ## Crate Features
//! #### Default
//!  - `ndarray`: [`ndarray`] conversion of [`ArrayBuffer`](crate::array::ArrayBuffer).
//!  - Codecs: `gzip`, `zlib`.
//!
//! ## Licence
//! `azarr` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod array;
pub mod consolidated;
pub mod indexer;
pub mod node;

/// Re-export [`azarr_metadata`].
pub use azarr_metadata as metadata;

/// Re-export [`azarr_storage`].
pub use azarr_storage as storage;
