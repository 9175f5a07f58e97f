//! A chain of Zarr V2 codecs.

use std::borrow::Cow;
use std::sync::Arc;

use azarr_metadata::v2::ArrayMetadataV2Order;

use super::{BytesCodec, BytesToBytesCodecTraits, CodecError, TransposeCodec};

/// A codec chain: an optional transpose, a bytes codec, filters, and an optional compressor.
#[derive(Clone, Debug)]
pub struct CodecChain {
    transpose: Option<TransposeCodec>,
    bytes: BytesCodec,
    filters: Vec<Arc<dyn BytesToBytesCodecTraits>>,
    compressor: Option<Arc<dyn BytesToBytesCodecTraits>>,
}

impl CodecChain {
    /// Create a new codec chain.
    #[must_use]
    pub fn new(
        order: ArrayMetadataV2Order,
        bytes: BytesCodec,
        filters: Vec<Arc<dyn BytesToBytesCodecTraits>>,
        compressor: Option<Arc<dyn BytesToBytesCodecTraits>>,
    ) -> Self {
        Self {
            transpose: match order {
                ArrayMetadataV2Order::C => None,
                ArrayMetadataV2Order::F => Some(TransposeCodec),
            },
            bytes,
            filters,
            compressor,
        }
    }

    /// Return the filters.
    #[must_use]
    pub fn filters(&self) -> &[Arc<dyn BytesToBytesCodecTraits>] {
        &self.filters
    }

    /// Return the compressor.
    #[must_use]
    pub fn compressor(&self) -> Option<&Arc<dyn BytesToBytesCodecTraits>> {
        self.compressor.as_ref()
    }

    /// Encode a chunk of `chunk_shape` elements of `element_size` bytes in native byte order and C order.
    ///
    /// # Errors
    /// Returns [`CodecError`] if `decoded_value` has the wrong size or a codec fails.
    pub fn encode<'a>(
        &self,
        decoded_value: Cow<'a, [u8]>,
        chunk_shape: &[usize],
        element_size: usize,
    ) -> Result<Cow<'a, [u8]>, CodecError> {
        let expected_size = chunk_shape.iter().product::<usize>() * element_size;
        if decoded_value.len() != expected_size {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                decoded_value.len(),
                expected_size,
            ));
        }
        let mut value = match &self.transpose {
            Some(transpose) => transpose.encode(decoded_value, chunk_shape, element_size),
            None => decoded_value,
        };
        value = self.bytes.encode(value);
        for filter in &self.filters {
            value = filter.encode(value)?;
        }
        if let Some(compressor) = &self.compressor {
            value = compressor.encode(value)?;
        }
        Ok(value)
    }

    /// Decode a chunk of `chunk_shape` elements of `element_size` bytes into native byte order and C order.
    ///
    /// # Errors
    /// Returns [`CodecError`] if a codec fails or the decoded chunk has the wrong size.
    pub fn decode<'a>(
        &self,
        encoded_value: Cow<'a, [u8]>,
        chunk_shape: &[usize],
        element_size: usize,
    ) -> Result<Cow<'a, [u8]>, CodecError> {
        let mut value = encoded_value;
        if let Some(compressor) = &self.compressor {
            value = compressor.decode(value)?;
        }
        for filter in self.filters.iter().rev() {
            value = filter.decode(value)?;
        }
        let expected_size = chunk_shape.iter().product::<usize>() * element_size;
        if value.len() != expected_size {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                value.len(),
                expected_size,
            ));
        }
        value = self.bytes.decode(value);
        Ok(match &self.transpose {
            Some(transpose) => transpose.decode(value, chunk_shape, element_size),
            None => value,
        })
    }
}
