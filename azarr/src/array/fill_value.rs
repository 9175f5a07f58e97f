//! Fill values.
//!
//! A fill value is the element used for uninitialised portions of an array, e.g. chunks that are missing from the store.

use std::ops::Range;

use base64::{Engine, prelude::BASE64_STANDARD};
use thiserror::Error;

use azarr_metadata::v2::FillValueMetadataV2;

use super::{DataType, codec::swap_byte_ranges};

/// A fill value: the bytes of one element in native byte order.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FillValue(Vec<u8>);

/// A data type and fill value metadata incompatibility error.
#[derive(Clone, Debug, Error)]
#[error("incompatible fill value {1:?} for data type {0}")]
pub struct IncompatibleFillValueError(DataType, FillValueMetadataV2);

impl FillValue {
    /// Create a new fill value from raw element bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the size in bytes of the fill value.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Return the byte representation of the fill value.
    #[must_use]
    pub fn as_ne_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if every byte of the fill value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&byte| byte == 0)
    }

    /// Interpret Zarr V2 fill value metadata for `data_type`.
    ///
    /// A `null` fill value returns [`None`].
    /// Raw and structured fill values are base64 encoded element bytes in their stored byte order, so `byte_swaps` (from the data type metadata) are applied to convert them to native byte order.
    ///
    /// # Errors
    /// Returns [`IncompatibleFillValueError`] if the fill value metadata is not valid for `data_type`.
    pub fn from_metadata_v2(
        metadata: &FillValueMetadataV2,
        data_type: &DataType,
        byte_swaps: &[Range<usize>],
    ) -> Result<Option<Self>, IncompatibleFillValueError> {
        let err = || IncompatibleFillValueError(data_type.clone(), metadata.clone());
        let fill_value = match (metadata, data_type) {
            (FillValueMetadataV2::Null, _) => return Ok(None),
            (FillValueMetadataV2::Bool(value), DataType::Bool) => Self::from(*value),
            (FillValueMetadataV2::Number(number), DataType::Bool) => match number.as_u64() {
                Some(0) => Self::from(false),
                Some(1) => Self::from(true),
                _ => return Err(err()),
            },
            (FillValueMetadataV2::Number(number), DataType::Int8) => {
                Self::from(int_from_number::<i8>(number).ok_or_else(err)?)
            }
            (FillValueMetadataV2::Number(number), DataType::Int16) => {
                Self::from(int_from_number::<i16>(number).ok_or_else(err)?)
            }
            (FillValueMetadataV2::Number(number), DataType::Int32) => {
                Self::from(int_from_number::<i32>(number).ok_or_else(err)?)
            }
            (FillValueMetadataV2::Number(number), DataType::Int64) => {
                Self::from(number.as_i64().ok_or_else(err)?)
            }
            (FillValueMetadataV2::Number(number), DataType::UInt8) => {
                Self::from(uint_from_number::<u8>(number).ok_or_else(err)?)
            }
            (FillValueMetadataV2::Number(number), DataType::UInt16) => {
                Self::from(uint_from_number::<u16>(number).ok_or_else(err)?)
            }
            (FillValueMetadataV2::Number(number), DataType::UInt32) => {
                Self::from(uint_from_number::<u32>(number).ok_or_else(err)?)
            }
            (FillValueMetadataV2::Number(number), DataType::UInt64) => {
                Self::from(number.as_u64().ok_or_else(err)?)
            }
            (FillValueMetadataV2::Number(number), DataType::Float32) => {
                #[expect(clippy::cast_possible_truncation)]
                let value = number.as_f64().ok_or_else(err)? as f32;
                Self::from(value)
            }
            (FillValueMetadataV2::Number(number), DataType::Float64) => {
                Self::from(number.as_f64().ok_or_else(err)?)
            }
            (FillValueMetadataV2::String(string), DataType::Float32) => {
                #[expect(clippy::cast_possible_truncation)]
                let value = non_finite_from_str(string).ok_or_else(err)? as f32;
                Self::from(value)
            }
            (FillValueMetadataV2::String(string), DataType::Float64) => {
                Self::from(non_finite_from_str(string).ok_or_else(err)?)
            }
            (
                FillValueMetadataV2::String(string),
                DataType::RawBytes(_) | DataType::Structured(_),
            ) => {
                let mut bytes = BASE64_STANDARD.decode(string).map_err(|_| err())?;
                if bytes.len() != data_type.size() {
                    return Err(err());
                }
                swap_byte_ranges(&mut bytes, data_type.size(), byte_swaps);
                Self(bytes)
            }
            (
                FillValueMetadataV2::Number(number),
                DataType::RawBytes(_) | DataType::Structured(_),
            ) if number.as_u64() == Some(0) => Self(vec![0; data_type.size()]),
            _ => return Err(err()),
        };
        Ok(Some(fill_value))
    }

    /// Returns true if all elements in `bytes` equal the fill value.
    #[must_use]
    pub fn equals_all(&self, bytes: &[u8]) -> bool {
        !self.0.is_empty()
            && bytes.len() % self.0.len() == 0
            && bytes
                .chunks_exact(self.0.len())
                .all(|element| element == self.0.as_slice())
    }
}

fn int_from_number<T: TryFrom<i64>>(number: &serde_json::Number) -> Option<T> {
    number.as_i64().and_then(|value| T::try_from(value).ok())
}

fn uint_from_number<T: TryFrom<u64>>(number: &serde_json::Number) -> Option<T> {
    number.as_u64().and_then(|value| T::try_from(value).ok())
}

fn non_finite_from_str(string: &str) -> Option<f64> {
    match string {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

impl From<Vec<u8>> for FillValue {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<bool> for FillValue {
    fn from(value: bool) -> Self {
        Self(vec![u8::from(value)])
    }
}

macro_rules! impl_fill_value_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FillValue {
                fn from(value: $t) -> Self {
                    Self(value.to_ne_bytes().to_vec())
                }
            }
        )*
    };
}

impl_fill_value_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

#[cfg(test)]
mod tests {
    use azarr_metadata::v2::DataTypeMetadataV2;

    use super::*;
    use crate::array::data_type::byte_swap_ranges_v2;

    fn fill_value(json: &str, data_type: &DataType) -> Option<FillValue> {
        let metadata: FillValueMetadataV2 = serde_json::from_str(json).unwrap();
        FillValue::from_metadata_v2(&metadata, data_type, &[]).unwrap()
    }

    #[test]
    fn fill_value_numbers() {
        assert_eq!(fill_value("null", &DataType::Int32), None);
        assert_eq!(
            fill_value("-7", &DataType::Int16),
            Some(FillValue::from(-7i16))
        );
        assert_eq!(
            fill_value("255", &DataType::UInt8),
            Some(FillValue::from(255u8))
        );
        assert_eq!(
            fill_value("1.5", &DataType::Float32),
            Some(FillValue::from(1.5f32))
        );
        assert_eq!(
            fill_value("3", &DataType::Float64),
            Some(FillValue::from(3.0f64))
        );
        assert_eq!(fill_value("true", &DataType::Bool), Some(FillValue::from(true)));
        assert_eq!(fill_value("0", &DataType::Bool), Some(FillValue::from(false)));

        let metadata = FillValueMetadataV2::from(256u64);
        assert!(FillValue::from_metadata_v2(&metadata, &DataType::UInt8, &[]).is_err());
        let metadata = FillValueMetadataV2::from(-1i64);
        assert!(FillValue::from_metadata_v2(&metadata, &DataType::UInt32, &[]).is_err());
        let metadata = FillValueMetadataV2::from(true);
        assert!(FillValue::from_metadata_v2(&metadata, &DataType::Int8, &[]).is_err());
    }

    #[test]
    fn fill_value_non_finite() {
        let nan = fill_value(r#""NaN""#, &DataType::Float64).unwrap();
        assert!(f64::from_ne_bytes(nan.as_ne_bytes().try_into().unwrap()).is_nan());
        assert_eq!(
            fill_value(r#""-Infinity""#, &DataType::Float32),
            Some(FillValue::from(f32::NEG_INFINITY))
        );
        let metadata = FillValueMetadataV2::String("nan".to_string());
        assert!(FillValue::from_metadata_v2(&metadata, &DataType::Float64, &[]).is_err());
    }

    #[test]
    fn fill_value_structured() {
        let dtype: DataTypeMetadataV2 = serde_json::from_str(r#"[["a", ">u2"], ["b", "|u1"]]"#).unwrap();
        let data_type = DataType::from_metadata_v2(&dtype).unwrap();
        let swaps = byte_swap_ranges_v2(&dtype).unwrap();
        // big endian 0x0102, then 0x03
        let metadata = FillValueMetadataV2::String(BASE64_STANDARD.encode([1u8, 2, 3]));
        let fill_value = FillValue::from_metadata_v2(&metadata, &data_type, &swaps)
            .unwrap()
            .unwrap();
        let mut expected = 0x0102u16.to_ne_bytes().to_vec();
        expected.push(3);
        assert_eq!(fill_value.as_ne_bytes(), expected.as_slice());

        let metadata = FillValueMetadataV2::String(BASE64_STANDARD.encode([1u8, 2]));
        assert!(FillValue::from_metadata_v2(&metadata, &data_type, &swaps).is_err());
    }

    #[test]
    fn fill_value_equals_all() {
        let fill_value = FillValue::from(1u16);
        let ones = [1u16, 1, 1].map(u16::to_ne_bytes).concat();
        assert!(fill_value.equals_all(&ones));
        assert!(!fill_value.equals_all(&[0, 1]));
        assert!(!fill_value.is_zero());
        assert!(FillValue::from(0.0f32).is_zero());
    }
}
