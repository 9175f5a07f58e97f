use super::{ArrayError, DataType, Element, FillValue};

/// The result of a selection: elements of a data type in native byte order and C order, with a shape.
///
/// A buffer is owned by the call that produced it and is never shared between concurrent selections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayBuffer {
    data_type: DataType,
    shape: Vec<u64>,
    bytes: Vec<u8>,
}

impl ArrayBuffer {
    /// Create a new array buffer.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidBytesInputSize`] if the length of `bytes` does not match `shape` and `data_type`.
    pub fn new(data_type: DataType, shape: Vec<u64>, bytes: Vec<u8>) -> Result<Self, ArrayError> {
        let expected = shape.iter().product::<u64>() * data_type.size() as u64;
        if bytes.len() as u64 == expected {
            Ok(Self {
                data_type,
                shape,
                bytes,
            })
        } else {
            Err(ArrayError::InvalidBytesInputSize(bytes.len(), expected))
        }
    }

    /// Create a new array buffer from elements.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if `T` is incompatible with `data_type` or the number of elements does not match `shape`.
    pub fn from_elements<T: Element>(
        data_type: DataType,
        shape: Vec<u64>,
        elements: &[T],
    ) -> Result<Self, ArrayError> {
        T::validate_data_type(&data_type)?;
        Self::new(data_type, shape, T::to_bytes(elements))
    }

    /// Create a new array buffer with every element equal to `fill_value`, or zeroed if there is no fill value.
    #[must_use]
    pub fn new_fill_value(data_type: DataType, shape: Vec<u64>, fill_value: Option<&FillValue>) -> Self {
        #[expect(clippy::cast_possible_truncation)]
        let num_elements = shape.iter().product::<u64>() as usize;
        let bytes = match fill_value {
            Some(fill_value) if !fill_value.is_zero() => fill_value.as_ne_bytes().repeat(num_elements),
            _ => vec![0; num_elements * data_type.size()],
        };
        Self {
            data_type,
            shape,
            bytes,
        }
    }

    /// The data type.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// The shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Returns true if the buffer holds a single element with no shape.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// The bytes of the elements in native byte order and C order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The mutable bytes of the elements in native byte order and C order.
    #[must_use]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Consume the buffer and return its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Convert the buffer to a vector of elements in C order.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if `T` is incompatible with the data type.
    pub fn to_elements<T: Element>(&self) -> Result<Vec<T>, ArrayError> {
        T::validate_data_type(&self.data_type)?;
        T::from_bytes(&self.bytes)
    }

    /// Convert the buffer to an [`ndarray::ArrayD`].
    ///
    /// # Errors
    /// Returns [`ArrayError`] if `T` is incompatible with the data type.
    #[cfg(feature = "ndarray")]
    pub fn to_ndarray<T: Element>(&self) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let elements = self.to_elements::<T>()?;
        #[expect(clippy::cast_possible_truncation)]
        let shape: Vec<usize> = self.shape.iter().map(|&extent| extent as usize).collect();
        ndarray::ArrayD::<T>::from_shape_vec(shape, elements)
            .map_err(|err| ArrayError::Other(err.to_string()))
    }

    /// Split the buffer along its first axis into one buffer per index.
    pub(crate) fn split_first_axis(self) -> Vec<Self> {
        if self.shape.is_empty() {
            return vec![self];
        }
        #[expect(clippy::cast_possible_truncation)]
        let extent = self.shape[0] as usize;
        let row = |bytes: Vec<u8>| Self {
            data_type: self.data_type.clone(),
            shape: self.shape[1..].to_vec(),
            bytes,
        };
        if self.bytes.is_empty() {
            return (0..extent).map(|_| row(vec![])).collect();
        }
        self.bytes
            .chunks_exact(self.bytes.len() / extent)
            .map(|bytes| row(bytes.to_vec()))
            .collect()
    }
}
