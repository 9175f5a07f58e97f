//! Zarr V2 data types.
//!
//! A [`DataType`] describes a fixed-size array element in native byte order.
//! It is parsed from `NumPy` style Zarr V2 data type metadata:
//!
//! | V2 `dtype`        | [`DataType`]                  |
//! |-------------------|-------------------------------|
//! | `\|b1`            | [`DataType::Bool`]            |
//! | `\|i1`, `<i2`, `<i4`, `<i8` | [`DataType::Int8`] .. [`DataType::Int64`] |
//! | `\|u1`, `<u2`, `<u4`, `<u8` | [`DataType::UInt8`] .. [`DataType::UInt64`] |
//! | `<f4`, `<f8`      | [`DataType::Float32`], [`DataType::Float64`] |
//! | `\|V8`            | [`DataType::RawBytes`]        |
//! | `[["a", "<i4"], ["b", "<f8"]]` | [`DataType::Structured`] |
//!
//! Big endian (`>`) variants are supported for multi-byte types; the bytes codec converts them to native byte order on decode.

use std::fmt::Display;
use std::ops::Range;

use itertools::Itertools;
use thiserror::Error;

use azarr_metadata::Endianness;
use azarr_metadata::v2::DataTypeMetadataV2;

/// A data type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// `bool` Boolean, one byte with value `0` (false) or `1` (true).
    Bool,
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    Float64,
    /// Uninterpreted bytes of a fixed size.
    RawBytes(usize),
    /// A structured data type with named fields.
    Structured(StructuredDataType),
}

/// A structured data type: an ordered list of named fields packed into each element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredDataType {
    fields: Vec<StructuredField>,
    size: usize,
}

/// A field of a [`StructuredDataType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredField {
    name: String,
    data_type: DataType,
    offset: usize,
}

impl StructuredField {
    /// The field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field data type.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// The byte offset of the field within an element.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

impl StructuredDataType {
    /// Create a structured data type from `(name, data_type)` pairs, packing fields contiguously in order.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if there are no fields or a field name is repeated.
    pub fn new(
        fields: impl IntoIterator<Item = (String, DataType)>,
    ) -> Result<Self, UnsupportedDataTypeError> {
        let mut offset = 0;
        let fields = fields
            .into_iter()
            .map(|(name, data_type)| {
                let field = StructuredField {
                    name,
                    offset,
                    data_type,
                };
                offset += field.data_type.size();
                field
            })
            .collect_vec();
        if fields.is_empty() {
            return Err(UnsupportedDataTypeError(
                "structured data type with no fields".to_string(),
            ));
        }
        if !fields.iter().map(StructuredField::name).all_unique() {
            return Err(UnsupportedDataTypeError(format!(
                "structured data type with duplicate field names: {}",
                fields.iter().map(StructuredField::name).join(", ")
            )));
        }
        Ok(Self {
            fields,
            size: offset,
        })
    }

    /// The fields.
    #[must_use]
    pub fn fields(&self) -> &[StructuredField] {
        &self.fields
    }

    /// Returns the field named `name`, if any.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&StructuredField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// An unsupported data type.
#[derive(Clone, Debug, Error)]
#[error("unsupported data type {0}")]
pub struct UnsupportedDataTypeError(String);

/// An invalid field selection for a data type.
#[derive(Clone, Debug, Error)]
pub enum FieldSelectionError {
    /// Fields were requested from a data type that is not structured.
    #[error("fields {0:?} requested from non-structured data type {1}")]
    NotStructured(Vec<String>, DataType),
    /// A requested field does not exist.
    #[error("field {0} does not exist in data type {1}")]
    MissingField(String, DataType),
}

impl DataType {
    /// Create a data type from Zarr V2 data type metadata.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if the data type is not supported.
    pub fn from_metadata_v2(metadata: &DataTypeMetadataV2) -> Result<Self, UnsupportedDataTypeError> {
        parse_v2(metadata, 0, &mut vec![])
    }

    /// Returns the size in bytes of an element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
            Self::RawBytes(size) => *size,
            Self::Structured(structured) => structured.size,
        }
    }

    /// Returns the structured data type, if this data type is structured.
    #[must_use]
    pub const fn as_structured(&self) -> Option<&StructuredDataType> {
        if let Self::Structured(structured) = self {
            Some(structured)
        } else {
            None
        }
    }

    /// Create a [`FieldProjection`] selecting `fields` from each element of this data type.
    ///
    /// No fields selects the whole element.
    /// A single field yields elements of that field's data type.
    /// Multiple fields yield a structured data type holding those fields in the requested order.
    ///
    /// # Errors
    /// Returns [`FieldSelectionError`] if this data type is not structured or a field does not exist.
    pub fn project_fields(&self, fields: &[String]) -> Result<FieldProjection, FieldSelectionError> {
        if fields.is_empty() {
            return Ok(FieldProjection::identity(self.clone()));
        }
        let Some(structured) = self.as_structured() else {
            return Err(FieldSelectionError::NotStructured(
                fields.to_vec(),
                self.clone(),
            ));
        };
        let selected = fields
            .iter()
            .map(|name| {
                structured
                    .field(name)
                    .ok_or_else(|| FieldSelectionError::MissingField(name.clone(), self.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let data_type = if let [field] = selected.as_slice() {
            field.data_type.clone()
        } else {
            Self::Structured(
                StructuredDataType::new(
                    selected
                        .iter()
                        .map(|field| (field.name.clone(), field.data_type.clone())),
                )
                .map_err(|_| FieldSelectionError::MissingField(fields.join(", "), self.clone()))?,
            )
        };
        let mut dst_offset = 0;
        let copies = selected
            .iter()
            .map(|field| {
                let size = field.data_type.size();
                let copy = FieldCopy {
                    src: field.offset..field.offset + size,
                    dst_offset,
                };
                dst_offset += size;
                copy
            })
            .collect();
        Ok(FieldProjection {
            data_type,
            src_size: self.size(),
            copies: Some(copies),
        })
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int8 => write!(f, "int8"),
            Self::Int16 => write!(f, "int16"),
            Self::Int32 => write!(f, "int32"),
            Self::Int64 => write!(f, "int64"),
            Self::UInt8 => write!(f, "uint8"),
            Self::UInt16 => write!(f, "uint16"),
            Self::UInt32 => write!(f, "uint32"),
            Self::UInt64 => write!(f, "uint64"),
            Self::Float32 => write!(f, "float32"),
            Self::Float64 => write!(f, "float64"),
            Self::RawBytes(size) => write!(f, "V{size}"),
            Self::Structured(structured) => write!(
                f,
                "[{}]",
                structured
                    .fields
                    .iter()
                    .map(|field| format!("({}, {})", field.name, field.data_type))
                    .join(", ")
            ),
        }
    }
}

/// Returns the byte ranges within an encoded element of a Zarr V2 data type that must be reversed to convert to or from native byte order.
///
/// # Errors
/// Returns [`UnsupportedDataTypeError`] if the data type is not supported.
pub(crate) fn byte_swap_ranges_v2(
    metadata: &DataTypeMetadataV2,
) -> Result<Vec<Range<usize>>, UnsupportedDataTypeError> {
    let mut swaps = vec![];
    parse_v2(metadata, 0, &mut swaps)?;
    Ok(swaps)
}

fn parse_v2(
    metadata: &DataTypeMetadataV2,
    offset: usize,
    swaps: &mut Vec<Range<usize>>,
) -> Result<DataType, UnsupportedDataTypeError> {
    match metadata {
        DataTypeMetadataV2::Simple(name) => {
            let (endianness, code) = metadata
                .simple_endianness()
                .map_err(|_| UnsupportedDataTypeError(name.clone()))?;
            let data_type = match code {
                "b1" => DataType::Bool,
                "i1" => DataType::Int8,
                "i2" => DataType::Int16,
                "i4" => DataType::Int32,
                "i8" => DataType::Int64,
                "u1" => DataType::UInt8,
                "u2" => DataType::UInt16,
                "u4" => DataType::UInt32,
                "u8" => DataType::UInt64,
                "f4" => DataType::Float32,
                "f8" => DataType::Float64,
                _ => {
                    let size = code
                        .strip_prefix('V')
                        .and_then(|size| size.parse::<usize>().ok())
                        .filter(|&size| size > 0)
                        .ok_or_else(|| UnsupportedDataTypeError(name.clone()))?;
                    DataType::RawBytes(size)
                }
            };
            let size = data_type.size();
            let multi_byte_number = size > 1 && !matches!(data_type, DataType::RawBytes(_));
            match endianness {
                None if multi_byte_number => {
                    return Err(UnsupportedDataTypeError(name.clone()));
                }
                Some(endianness) if multi_byte_number && endianness != Endianness::NATIVE => {
                    swaps.push(offset..offset + size);
                }
                _ => {}
            }
            Ok(data_type)
        }
        DataTypeMetadataV2::Structured(fields) => {
            let mut field_offset = offset;
            let fields = fields
                .iter()
                .map(|field| {
                    let data_type = parse_v2(&field.1, field_offset, swaps)?;
                    field_offset += data_type.size();
                    Ok((field.0.clone(), data_type))
                })
                .collect::<Result<Vec<_>, UnsupportedDataTypeError>>()?;
            Ok(DataType::Structured(StructuredDataType::new(fields)?))
        }
    }
}

/// A copy of a byte range of a source element to an offset in a destination element.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldCopy {
    src: Range<usize>,
    dst_offset: usize,
}

/// A projection of the elements of a data type onto a subset of its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProjection {
    data_type: DataType,
    src_size: usize,
    /// [`None`] if every element is copied unchanged.
    copies: Option<Vec<FieldCopy>>,
}

impl FieldProjection {
    /// A projection that keeps whole elements of `data_type`.
    #[must_use]
    pub fn identity(data_type: DataType) -> Self {
        Self {
            src_size: data_type.size(),
            data_type,
            copies: None,
        }
    }

    /// The data type of projected elements.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Returns true if the projection keeps whole elements.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.copies.is_none()
    }

    /// Project the elements in `bytes`, which must hold a whole number of source elements.
    #[must_use]
    pub fn apply<'a>(&self, bytes: std::borrow::Cow<'a, [u8]>) -> std::borrow::Cow<'a, [u8]> {
        let Some(copies) = &self.copies else {
            return bytes;
        };
        debug_assert_eq!(bytes.len() % self.src_size, 0);
        let dst_size = self.data_type.size();
        let mut out = vec![0; bytes.len() / self.src_size * dst_size];
        for (src, dst) in bytes
            .chunks_exact(self.src_size)
            .zip(out.chunks_exact_mut(dst_size))
        {
            for copy in copies {
                dst[copy.dst_offset..copy.dst_offset + copy.src.len()]
                    .copy_from_slice(&src[copy.src.clone()]);
            }
        }
        std::borrow::Cow::Owned(out)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    fn v2(json: &str) -> DataTypeMetadataV2 {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn data_type_simple() {
        assert_eq!(
            DataType::from_metadata_v2(&v2(r#""|b1""#)).unwrap(),
            DataType::Bool
        );
        assert_eq!(
            DataType::from_metadata_v2(&v2(r#""<i4""#)).unwrap(),
            DataType::Int32
        );
        assert_eq!(
            DataType::from_metadata_v2(&v2(r#"">f8""#)).unwrap(),
            DataType::Float64
        );
        assert_eq!(
            DataType::from_metadata_v2(&v2(r#""|V3""#)).unwrap(),
            DataType::RawBytes(3)
        );
        assert!(DataType::from_metadata_v2(&v2(r#""<c16""#)).is_err());
        assert!(DataType::from_metadata_v2(&v2(r#""|i4""#)).is_err());
        assert!(DataType::from_metadata_v2(&v2(r#""|V0""#)).is_err());
    }

    #[test]
    fn data_type_byte_swaps() {
        let foreign = if Endianness::NATIVE == Endianness::Little {
            ">"
        } else {
            "<"
        };
        let json = format!(r#"[["a", "{foreign}u2"], ["b", "|u1"], ["c", "{foreign}f8"]]"#);
        let swaps = byte_swap_ranges_v2(&v2(&json)).unwrap();
        assert_eq!(swaps, vec![0..2, 3..11]);
        let json = format!(r#""{foreign}u1""#);
        assert!(byte_swap_ranges_v2(&v2(&json)).unwrap().is_empty());
    }

    #[test]
    fn data_type_structured() {
        let data_type = DataType::from_metadata_v2(&v2(
            r#"[["a", "<i4"], ["b", [["x", "|u1"], ["y", "<u2"]]]]"#,
        ))
        .unwrap();
        assert_eq!(data_type.size(), 7);
        let structured = data_type.as_structured().unwrap();
        assert_eq!(structured.fields().len(), 2);
        assert_eq!(structured.field("b").unwrap().offset(), 4);
        assert_eq!(data_type.to_string(), "[(a, int32), (b, [(x, uint8), (y, uint16)])]");
        assert!(DataType::from_metadata_v2(&v2(r#"[["a", "<i4"], ["a", "<i4"]]"#)).is_err());
    }

    #[test]
    fn project_fields() {
        let data_type =
            DataType::from_metadata_v2(&v2(r#"[["a", "|u1"], ["b", "|i1"], ["c", "|u1"]]"#))
                .unwrap();
        let bytes: Vec<u8> = vec![1, 2, 3, 4, 5, 6];

        let projection = data_type.project_fields(&[]).unwrap();
        assert!(projection.is_identity());
        assert_eq!(projection.apply(Cow::Borrowed(&bytes)).as_ref(), &bytes);

        let projection = data_type.project_fields(&["b".to_string()]).unwrap();
        assert_eq!(projection.data_type(), &DataType::Int8);
        assert_eq!(projection.apply(Cow::Borrowed(&bytes)).as_ref(), &[2, 5]);

        let projection = data_type
            .project_fields(&["c".to_string(), "a".to_string()])
            .unwrap();
        assert_eq!(projection.data_type().size(), 2);
        assert_eq!(
            projection.apply(Cow::Borrowed(&bytes)).as_ref(),
            &[3, 1, 6, 4]
        );

        assert!(data_type.project_fields(&["d".to_string()]).is_err());
        assert!(
            DataType::Int8
                .project_fields(&["a".to_string()])
                .is_err()
        );
    }
}
