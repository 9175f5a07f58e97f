//! The transpose codec, which converts chunks stored in F (column-major) order to C (row-major) order.

use std::borrow::Cow;

/// A transpose codec.
///
/// Chunks of arrays with F order are transposed to C order on decode, and back to F order on encode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransposeCodec;

impl TransposeCodec {
    /// Convert a C order chunk of shape `chunk_shape` to F order.
    #[must_use]
    pub fn encode<'a>(
        &self,
        decoded_value: Cow<'a, [u8]>,
        chunk_shape: &[usize],
        element_size: usize,
    ) -> Cow<'a, [u8]> {
        reverse_axes(decoded_value, chunk_shape, element_size)
    }

    /// Convert an F order chunk of shape `chunk_shape` to C order.
    #[must_use]
    pub fn decode<'a>(
        &self,
        encoded_value: Cow<'a, [u8]>,
        chunk_shape: &[usize],
        element_size: usize,
    ) -> Cow<'a, [u8]> {
        let stored_shape: Vec<usize> = chunk_shape.iter().rev().copied().collect();
        reverse_axes(encoded_value, &stored_shape, element_size)
    }
}

/// Reorder the C order elements of an array of `shape` into the C order of an array with reversed axes.
fn reverse_axes<'a>(bytes: Cow<'a, [u8]>, shape: &[usize], element_size: usize) -> Cow<'a, [u8]> {
    if shape.iter().filter(|&&extent| extent > 1).count() <= 1 {
        // at most one non-unit axis, the orders coincide
        return bytes;
    }
    let rank = shape.len();
    let num_elements: usize = shape.iter().product();
    let mut strides = vec![1usize; rank];
    for axis in (0..rank - 1).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    let out_shape: Vec<usize> = shape.iter().rev().copied().collect();
    let out_strides: Vec<usize> = strides.iter().rev().copied().collect();

    let mut out = Vec::with_capacity(num_elements * element_size);
    let mut index = vec![0usize; rank];
    for _ in 0..num_elements {
        let offset: usize = index
            .iter()
            .zip(&out_strides)
            .map(|(index, stride)| index * stride)
            .sum::<usize>()
            * element_size;
        out.extend_from_slice(&bytes[offset..offset + element_size]);
        for axis in (0..rank).rev() {
            index[axis] += 1;
            if index[axis] < out_shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    Cow::Owned(out)
}
