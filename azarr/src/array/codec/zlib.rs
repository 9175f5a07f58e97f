//! The `zlib` compressor.
//!
//! This codec requires the `zlib` feature, which is enabled by default.
//!
//! ### Codec Metadata Example
//! ```json
//! {
//!     "id": "zlib",
//!     "level": 1
//! }
//! ```

use std::borrow::Cow;
use std::io::{Cursor, Read};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use azarr_metadata::v2::MetadataV2;

use super::{BytesToBytesCodecTraits, CodecCreateError, CodecError};

/// The `zlib` codec `id`.
pub(crate) const ZLIB: &str = "zlib";

/// `zlib` codec configuration parameters.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct ZlibCodecConfiguration {
    /// The compression level, from 0 (none) to 9 (best).
    pub level: u32,
}

/// A `zlib` codec implementation.
#[derive(Clone, Debug)]
pub struct ZlibCodec {
    compression: flate2::Compression,
}

impl ZlibCodec {
    /// Create a new `zlib` codec with a compression level from 0 to 9.
    ///
    /// # Errors
    /// Returns [`CodecCreateError`] if `level` is greater than 9.
    pub fn new(level: u32) -> Result<Self, CodecCreateError> {
        if level > 9 {
            return Err(CodecCreateError::InvalidConfiguration(
                ZLIB.to_string(),
                format!("compression level {level} is not in 0..=9"),
            ));
        }
        Ok(Self {
            compression: flate2::Compression::new(level),
        })
    }

    /// Create a new `zlib` codec from configuration.
    ///
    /// # Errors
    /// Returns [`CodecCreateError`] if the configuration is not supported.
    pub fn new_with_configuration(
        configuration: &ZlibCodecConfiguration,
    ) -> Result<Self, CodecCreateError> {
        Self::new(configuration.level)
    }
}

pub(crate) fn create_codec_zlib(
    metadata: &MetadataV2,
) -> Result<Arc<dyn BytesToBytesCodecTraits>, CodecCreateError> {
    let configuration: ZlibCodecConfiguration = metadata
        .to_typed_configuration()
        .map_err(|err| CodecCreateError::InvalidConfiguration(ZLIB.to_string(), err.to_string()))?;
    Ok(Arc::new(ZlibCodec::new_with_configuration(&configuration)?))
}

impl BytesToBytesCodecTraits for ZlibCodec {
    fn id(&self) -> &str {
        ZLIB
    }

    fn encode<'a>(&self, decoded_value: Cow<'a, [u8]>) -> Result<Cow<'a, [u8]>, CodecError> {
        let mut encoder =
            flate2::read::ZlibEncoder::new(Cursor::new(decoded_value), self.compression);
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(Cow::Owned(out))
    }

    fn decode<'a>(&self, encoded_value: Cow<'a, [u8]>) -> Result<Cow<'a, [u8]>, CodecError> {
        let mut decoder = flate2::read::ZlibDecoder::new(Cursor::new(encoded_value));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(Cow::Owned(out))
    }
}
