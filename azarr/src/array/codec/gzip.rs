//! The `gzip` compressor.
//!
//! This codec requires the `gzip` feature, which is enabled by default.
//!
//! ### Codec Metadata Example
//! ```json
//! {
//!     "id": "gzip",
//!     "level": 5
//! }
//! ```

use std::borrow::Cow;
use std::io::{Cursor, Read};
use std::sync::Arc;

use flate2::bufread::{GzDecoder, GzEncoder};
use serde::{Deserialize, Serialize};

use azarr_metadata::v2::MetadataV2;

use super::{BytesToBytesCodecTraits, CodecCreateError, CodecError};

/// The `gzip` codec `id`.
pub(crate) const GZIP: &str = "gzip";

/// `gzip` codec configuration parameters.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct GzipCodecConfiguration {
    /// The compression level, from 0 (none) to 9 (best).
    pub level: u32,
}

/// A `gzip` codec implementation.
#[derive(Clone, Debug)]
pub struct GzipCodec {
    compression: flate2::Compression,
}

impl GzipCodec {
    /// Create a new `gzip` codec with a compression level from 0 to 9.
    ///
    /// # Errors
    /// Returns [`CodecCreateError`] if `level` is greater than 9.
    pub fn new(level: u32) -> Result<Self, CodecCreateError> {
        if level > 9 {
            return Err(CodecCreateError::InvalidConfiguration(
                GZIP.to_string(),
                format!("compression level {level} is not in 0..=9"),
            ));
        }
        Ok(Self {
            compression: flate2::Compression::new(level),
        })
    }

    /// Create a new `gzip` codec from configuration.
    ///
    /// # Errors
    /// Returns [`CodecCreateError`] if the configuration is not supported.
    pub fn new_with_configuration(
        configuration: &GzipCodecConfiguration,
    ) -> Result<Self, CodecCreateError> {
        Self::new(configuration.level)
    }
}

pub(crate) fn create_codec_gzip(
    metadata: &MetadataV2,
) -> Result<Arc<dyn BytesToBytesCodecTraits>, CodecCreateError> {
    let configuration: GzipCodecConfiguration = metadata
        .to_typed_configuration()
        .map_err(|err| CodecCreateError::InvalidConfiguration(GZIP.to_string(), err.to_string()))?;
    Ok(Arc::new(GzipCodec::new_with_configuration(&configuration)?))
}

impl BytesToBytesCodecTraits for GzipCodec {
    fn id(&self) -> &str {
        GZIP
    }

    fn encode<'a>(&self, decoded_value: Cow<'a, [u8]>) -> Result<Cow<'a, [u8]>, CodecError> {
        let mut encoder = GzEncoder::new(Cursor::new(decoded_value), self.compression);
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(Cow::Owned(out))
    }

    fn decode<'a>(&self, encoded_value: Cow<'a, [u8]>) -> Result<Cow<'a, [u8]>, CodecError> {
        let mut decoder = GzDecoder::new(Cursor::new(encoded_value));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(Cow::Owned(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_gzip_round_trip() {
        let elements: Vec<u16> = (0..32).collect();
        let bytes: Vec<u8> = bytemuck::cast_slice(&elements).to_vec();
        let metadata: MetadataV2 = serde_json::from_str(r#"{"id": "gzip", "level": 5}"#).unwrap();
        let codec = create_codec_gzip(&metadata).unwrap();
        assert_eq!(codec.id(), GZIP);
        let encoded = codec.encode(Cow::Borrowed(&bytes)).unwrap();
        assert_ne!(encoded.as_ref(), bytes.as_slice());
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(decoded.as_ref(), bytes.as_slice());
    }

    #[test]
    fn codec_gzip_invalid() {
        assert!(GzipCodec::new(10).is_err());
        let metadata: MetadataV2 = serde_json::from_str(r#"{"id": "gzip", "lvl": 5}"#).unwrap();
        assert!(create_codec_gzip(&metadata).is_err());
        let codec = GzipCodec::new(1).unwrap();
        assert!(codec.decode(Cow::Borrowed(&[1, 2, 3])).is_err());
    }
}
