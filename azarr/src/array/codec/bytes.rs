//! The bytes codec, which converts elements between native byte order and the byte order of a data type.

use std::borrow::Cow;
use std::ops::Range;

/// Reverse the bytes in each of `ranges` within every element of `bytes`.
///
/// `bytes` must hold a whole number of elements of `element_size` bytes.
pub(crate) fn swap_byte_ranges(bytes: &mut [u8], element_size: usize, ranges: &[Range<usize>]) {
    if ranges.is_empty() || element_size == 0 {
        return;
    }
    for element in bytes.chunks_exact_mut(element_size) {
        for range in ranges {
            element[range.clone()].reverse();
        }
    }
}

/// A bytes codec.
///
/// Multi-byte components of an element that are stored in non-native byte order are reversed on encode and decode.
/// If every component is native or single-byte, the codec passes bytes through unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesCodec {
    element_size: usize,
    swaps: Vec<Range<usize>>,
}

impl BytesCodec {
    /// Create a new bytes codec for elements of `element_size` bytes with byte ranges `swaps` to reverse in each element.
    #[must_use]
    pub fn new(element_size: usize, swaps: Vec<Range<usize>>) -> Self {
        Self {
            element_size,
            swaps,
        }
    }

    /// Returns true if the codec does not change bytes.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.swaps.is_empty()
    }

    /// Convert native byte order elements to the stored byte order.
    #[must_use]
    pub fn encode<'a>(&self, decoded_value: Cow<'a, [u8]>) -> Cow<'a, [u8]> {
        self.swap(decoded_value)
    }

    /// Convert stored byte order elements to native byte order.
    #[must_use]
    pub fn decode<'a>(&self, encoded_value: Cow<'a, [u8]>) -> Cow<'a, [u8]> {
        self.swap(encoded_value)
    }

    fn swap<'a>(&self, value: Cow<'a, [u8]>) -> Cow<'a, [u8]> {
        if self.is_passthrough() {
            value
        } else {
            let mut value = value.into_owned();
            swap_byte_ranges(&mut value, self.element_size, &self.swaps);
            Cow::Owned(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_bytes_swap() {
        let codec = BytesCodec::new(3, vec![0..2]);
        let bytes = [1u8, 2, 3, 4, 5, 6];
        let encoded = codec.encode(Cow::Borrowed(&bytes));
        assert_eq!(encoded.as_ref(), &[2, 1, 3, 5, 4, 6]);
        let decoded = codec.decode(encoded);
        assert_eq!(decoded.as_ref(), &bytes);
    }

    #[test]
    fn codec_bytes_passthrough() {
        let codec = BytesCodec::new(4, vec![]);
        assert!(codec.is_passthrough());
        let bytes = [1u8, 2, 3, 4];
        assert!(matches!(codec.decode(Cow::Borrowed(&bytes)), Cow::Borrowed(_)));
    }
}
