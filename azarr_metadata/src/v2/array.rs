use std::num::NonZeroU64;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Attributes, ChunkKeySeparator, Endianness};

use super::MetadataV2;

/// Zarr V2 array metadata, stored in `.zarray`.
///
/// For example:
/// ```json
/// {
///     "zarr_format": 2,
///     "shape": [10000, 10000],
///     "chunks": [1000, 1000],
///     "dtype": "<f8",
///     "compressor": {"id": "zlib", "level": 1},
///     "fill_value": "NaN",
///     "order": "C",
///     "filters": null,
///     "dimension_separator": "."
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ArrayMetadataV2 {
    /// An integer defining the version of the storage specification to which the array adheres. Must be `2`.
    pub zarr_format: monostate::MustBe!(2u64),
    /// An array of integers providing the length of each dimension of the array.
    pub shape: Vec<u64>,
    /// An array of integers providing the length of each dimension of a chunk of the array.
    pub chunks: Vec<NonZeroU64>,
    /// The data type of the array.
    pub dtype: DataTypeMetadataV2,
    /// The primary compression codec, or `null` for no compression.
    pub compressor: Option<MetadataV2>,
    /// The value used for uninitialised portions of the array, or `null` if there is none.
    #[serde(default)]
    pub fill_value: FillValueMetadataV2,
    /// The memory layout of the bytes within each chunk.
    pub order: ArrayMetadataV2Order,
    /// Codecs applied prior to the compressor when encoding, or `null`.
    pub filters: Option<Vec<MetadataV2>>,
    /// The separator placed between the chunk indices of a chunk key.
    #[serde(default)]
    pub dimension_separator: ChunkKeySeparator,
    /// Attributes, stored separately in `.zattrs`.
    #[serde(skip)]
    pub attributes: Attributes,
}

impl ArrayMetadataV2 {
    /// Create Zarr V2 array metadata.
    ///
    /// The defaults are no compressor, no filters, a `null` fill value, C order and a `.` dimension separator.
    #[must_use]
    pub fn new(shape: Vec<u64>, chunks: Vec<NonZeroU64>, dtype: DataTypeMetadataV2) -> Self {
        Self {
            zarr_format: Default::default(),
            shape,
            chunks,
            dtype,
            compressor: None,
            fill_value: FillValueMetadataV2::Null,
            order: ArrayMetadataV2Order::C,
            filters: None,
            dimension_separator: ChunkKeySeparator::Dot,
            attributes: Attributes::default(),
        }
    }

    /// Set the compressor.
    #[must_use]
    pub fn with_compressor(mut self, compressor: Option<MetadataV2>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Set the filters.
    #[must_use]
    pub fn with_filters(mut self, filters: Option<Vec<MetadataV2>>) -> Self {
        self.filters = filters;
        self
    }

    /// Set the fill value.
    #[must_use]
    pub fn with_fill_value(mut self, fill_value: FillValueMetadataV2) -> Self {
        self.fill_value = fill_value;
        self
    }

    /// Set the order.
    #[must_use]
    pub fn with_order(mut self, order: ArrayMetadataV2Order) -> Self {
        self.order = order;
        self
    }

    /// Set the dimension separator.
    #[must_use]
    pub fn with_dimension_separator(mut self, dimension_separator: ChunkKeySeparator) -> Self {
        self.dimension_separator = dimension_separator;
        self
    }

    /// Set the attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// The layout of bytes within each chunk of a Zarr V2 array.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum ArrayMetadataV2Order {
    /// Row-major order. The last dimension varies fastest.
    C,
    /// Column-major order. The first dimension varies fastest.
    F,
}

/// Zarr V2 data type metadata.
///
/// Either a `NumPy` type string such as `<i4`, or a list of named fields for a structured data type.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(untagged)]
pub enum DataTypeMetadataV2 {
    /// A simple data type, e.g. `<f8` or `|b1`.
    Simple(String),
    /// A structured data type, e.g. `[["a", "<i4"], ["b", "<f8"]]`.
    Structured(Vec<DataTypeMetadataV2StructuredField>),
}

/// A field of a structured Zarr V2 data type: a name and a data type.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct DataTypeMetadataV2StructuredField(pub String, pub DataTypeMetadataV2);

/// An invalid byte order prefix in a Zarr V2 data type.
#[derive(Clone, Debug, Error)]
#[error("invalid V2 data type byte order in {0}, expected a `<`, `>` or `|` prefix")]
pub struct DataTypeMetadataV2EndiannessError(String);

impl DataTypeMetadataV2 {
    /// Split a simple data type into its endianness and its type code (e.g. `<i4` to little endian `i4`).
    ///
    /// The endianness is [`None`] for the `|` (not applicable) prefix.
    ///
    /// # Errors
    /// Returns [`DataTypeMetadataV2EndiannessError`] if the data type is structured or the prefix is invalid.
    pub fn simple_endianness(
        &self,
    ) -> Result<(Option<Endianness>, &str), DataTypeMetadataV2EndiannessError> {
        let Self::Simple(name) = self else {
            return Err(DataTypeMetadataV2EndiannessError(
                "structured data type".to_string(),
            ));
        };
        if let Some(code) = name.strip_prefix('<') {
            Ok((Some(Endianness::Little), code))
        } else if let Some(code) = name.strip_prefix('>') {
            Ok((Some(Endianness::Big), code))
        } else if let Some(code) = name.strip_prefix('|') {
            Ok((None, code))
        } else {
            Err(DataTypeMetadataV2EndiannessError(name.clone()))
        }
    }
}

/// Zarr V2 fill value metadata.
///
/// Non-finite floating point fill values are encoded as the strings `"NaN"`, `"Infinity"` and `"-Infinity"`.
/// Structured data types encode their fill value as a base64 string of the raw element bytes.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(untagged)]
pub enum FillValueMetadataV2 {
    /// No fill value.
    #[default]
    Null,
    /// A boolean fill value.
    Bool(bool),
    /// A numeric fill value.
    Number(serde_json::Number),
    /// A string fill value.
    String(String),
}

impl FillValueMetadataV2 {
    /// Returns true if there is no fill value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for FillValueMetadataV2 {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for FillValueMetadataV2 {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for FillValueMetadataV2 {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or_else(
            || {
                Self::String(
                    if value.is_nan() {
                        "NaN"
                    } else if value.is_sign_positive() {
                        "Infinity"
                    } else {
                        "-Infinity"
                    }
                    .to_string(),
                )
            },
            Self::Number,
        )
    }
}

impl From<bool> for FillValueMetadataV2 {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
