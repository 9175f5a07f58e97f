use super::{ArrayError, DataType};

/// A trait representing an array element type.
pub trait Element: Sized + Copy + Send + Sync {
    /// Validate the data type.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if the data type is incompatible with [`Element`].
    fn validate_data_type(data_type: &DataType) -> Result<(), ArrayError>;

    /// Convert a slice of elements into native byte order bytes.
    fn to_bytes(elements: &[Self]) -> Vec<u8>;

    /// Convert native byte order bytes into elements.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if `bytes` does not hold a whole number of valid elements.
    fn from_bytes(bytes: &[u8]) -> Result<Vec<Self>, ArrayError>;
}

impl Element for bool {
    fn validate_data_type(data_type: &DataType) -> Result<(), ArrayError> {
        if data_type == &DataType::Bool {
            Ok(())
        } else {
            Err(ArrayError::IncompatibleElementType("bool", data_type.clone()))
        }
    }

    fn to_bytes(elements: &[Self]) -> Vec<u8> {
        elements.iter().map(|&element| u8::from(element)).collect()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Vec<Self>, ArrayError> {
        bytes
            .iter()
            .map(|&byte| match byte {
                0 => Ok(false),
                1 => Ok(true),
                byte => Err(ArrayError::InvalidElementValue(format!(
                    "{byte} is not a valid bool"
                ))),
            })
            .collect()
    }
}

macro_rules! impl_element_pod {
    ($type:ty, $data_type:path) => {
        impl Element for $type {
            fn validate_data_type(data_type: &DataType) -> Result<(), ArrayError> {
                if matches!(data_type, $data_type) {
                    Ok(())
                } else {
                    Err(ArrayError::IncompatibleElementType(
                        stringify!($type),
                        data_type.clone(),
                    ))
                }
            }

            fn to_bytes(elements: &[Self]) -> Vec<u8> {
                bytemuck::cast_slice(elements).to_vec()
            }

            fn from_bytes(bytes: &[u8]) -> Result<Vec<Self>, ArrayError> {
                if bytes.len() % size_of::<Self>() == 0 {
                    Ok(bytemuck::pod_collect_to_vec(bytes))
                } else {
                    Err(ArrayError::InvalidBytesInputSize(
                        bytes.len(),
                        (bytes.len() / size_of::<Self>() * size_of::<Self>()) as u64,
                    ))
                }
            }
        }
    };
}

impl_element_pod!(i8, DataType::Int8);
impl_element_pod!(i16, DataType::Int16);
impl_element_pod!(i32, DataType::Int32);
impl_element_pod!(i64, DataType::Int64);
impl_element_pod!(u8, DataType::UInt8);
impl_element_pod!(u16, DataType::UInt16);
impl_element_pod!(u32, DataType::UInt32);
impl_element_pod!(u64, DataType::UInt64);
impl_element_pod!(f32, DataType::Float32);
impl_element_pod!(f64, DataType::Float64);
