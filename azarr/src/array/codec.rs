//! Zarr V2 codecs.
//!
//! A chunk is encoded by a [`CodecChain`] in the following order:
//!  1. a transpose to C order, if the array has F order,
//!  2. the bytes codec, which converts elements from native byte order to the byte order of the data type,
//!  3. each filter in order, and
//!  4. the compressor, if any.
//!
//! Decoding applies the reverse.
//!
//! Filters and compressors are bytes to bytes codecs implementing [`BytesToBytesCodecTraits`].
//! They are created from their `{"id": ..., ...}` metadata by a [`CodecRegistry`].
//! The default registry supports:
//!  - `gzip` (feature `gzip`), and
//!  - `zlib` (feature `zlib`).

mod bytes;
mod codec_chain;
#[cfg(feature = "gzip")]
mod gzip;
mod registry;
mod transpose;
#[cfg(feature = "zlib")]
mod zlib;

use std::borrow::Cow;
use std::sync::Arc;

use thiserror::Error;

pub use bytes::BytesCodec;
pub(crate) use bytes::swap_byte_ranges;
pub use codec_chain::CodecChain;
#[cfg(feature = "gzip")]
pub use gzip::{GzipCodec, GzipCodecConfiguration};
pub use registry::{CodecCreateError, CodecCreateFn, CodecRegistry};
pub use transpose::TransposeCodec;
#[cfg(feature = "zlib")]
pub use zlib::{ZlibCodec, ZlibCodecConfiguration};

/// Traits for bytes to bytes codecs.
pub trait BytesToBytesCodecTraits: core::fmt::Debug + Send + Sync {
    /// The codec `id`.
    fn id(&self) -> &str;

    /// Encode bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if a codec fails.
    fn encode<'a>(&self, decoded_value: Cow<'a, [u8]>) -> Result<Cow<'a, [u8]>, CodecError>;

    /// Decode bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if a codec fails.
    fn decode<'a>(&self, encoded_value: Cow<'a, [u8]>) -> Result<Cow<'a, [u8]>, CodecError>;
}

/// A codec error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] Arc<std::io::Error>),
    /// The decoded size of a chunk did not match what was expected.
    #[error("the size of a decoded chunk is {0}, expected {1}")]
    UnexpectedChunkDecodedSize(usize, usize),
    /// Other
    #[error("{_0}")]
    Other(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}

impl From<&str> for CodecError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
