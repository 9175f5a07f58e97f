use thiserror::Error;

use azarr_storage::{StorageError, StoreKey};

use super::codec::{CodecCreateError, CodecError};
use super::data_type::{FieldSelectionError, UnsupportedDataTypeError};
use super::fill_value::IncompatibleFillValueError;
use super::DataType;
use crate::indexer::IndexerError;
use crate::node::NodePathError;

/// An array creation error.
#[derive(Clone, Debug, Error)]
pub enum ArrayCreateError {
    /// An invalid node path
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// Unsupported data type.
    #[error(transparent)]
    DataTypeCreateError(#[from] UnsupportedDataTypeError),
    /// Invalid fill value metadata.
    #[error(transparent)]
    InvalidFillValueMetadata(#[from] IncompatibleFillValueError),
    /// Error creating codecs.
    #[error(transparent)]
    CodecsCreateError(#[from] CodecCreateError),
    /// The dimensionality of the chunk shape does not match the array shape.
    #[error("chunk shape dimensionality {0} does not match array dimensionality {1}")]
    InvalidChunkShapeDimensionality(usize, usize),
    /// Invalid JSON metadata.
    #[error("invalid metadata at {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// Missing metadata.
    #[error("array metadata is missing at {0}")]
    MissingMetadata(StoreKey),
}

/// Array errors.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ArrayError {
    /// A store error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A codec error.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// An invalid selection.
    #[error(transparent)]
    IndexerError(#[from] IndexerError),
    /// Invalid chunk grid indices.
    #[error("invalid chunk grid indices: {_0:?}")]
    InvalidChunkGridIndicesError(Vec<u64>),
    /// An unexpected bytes input size.
    #[error("got bytes with size {_0:?}, expected {_1:?}")]
    InvalidBytesInputSize(usize, u64),
    /// Incompatible element type.
    #[error("the element type {_0} does not match the data type {_1}")]
    IncompatibleElementType(&'static str, DataType),
    /// Incompatible data type.
    #[error("got data with data type {_0}, expected {_1}")]
    IncompatibleDataType(DataType, DataType),
    /// Invalid data shape.
    #[error("data has shape {_0:?}, expected {_1:?}")]
    InvalidDataShape(Vec<u64>, Vec<u64>),
    /// Invalid element value.
    ///
    /// For example, a bool array with a value not equal to 0 (false) or 1 (true).
    #[error("invalid element value {_0}")]
    InvalidElementValue(String),
    /// Unsupported method.
    #[error("unsupported array method: {_0}")]
    UnsupportedMethod(String),
    /// Any other error.
    #[error("{_0}")]
    Other(String),
}

impl From<FieldSelectionError> for ArrayError {
    fn from(err: FieldSelectionError) -> Self {
        Self::IndexerError(err.into())
    }
}

/// A coarse classification of an [`ArrayError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArrayErrorKind {
    /// A required node, metadata document or value does not exist.
    NotFound,
    /// Stored data or metadata is malformed.
    Format,
    /// The selection is invalid for the array.
    Selection,
    /// A chunk could not be decoded.
    Decode,
    /// The operation is not supported.
    Unsupported,
    /// The store failed.
    Storage,
}

impl ArrayError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ArrayErrorKind {
        match self {
            Self::StorageError(StorageError::InvalidMetadata(..)) => ArrayErrorKind::Format,
            Self::StorageError(StorageError::Unsupported(_)) | Self::UnsupportedMethod(_) => {
                ArrayErrorKind::Unsupported
            }
            Self::StorageError(_) | Self::Other(_) => ArrayErrorKind::Storage,
            Self::CodecError(_) => ArrayErrorKind::Decode,
            Self::IndexerError(_)
            | Self::InvalidChunkGridIndicesError(_)
            | Self::InvalidBytesInputSize(..)
            | Self::IncompatibleElementType(..)
            | Self::IncompatibleDataType(..)
            | Self::InvalidDataShape(..) => ArrayErrorKind::Selection,
            Self::InvalidElementValue(_) => ArrayErrorKind::Format,
        }
    }
}

impl ArrayCreateError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ArrayErrorKind {
        match self {
            Self::MissingMetadata(_) => ArrayErrorKind::NotFound,
            Self::StorageError(StorageError::Unsupported(_)) => ArrayErrorKind::Unsupported,
            Self::StorageError(StorageError::InvalidMetadata(..)) => ArrayErrorKind::Format,
            Self::StorageError(_) => ArrayErrorKind::Storage,
            Self::DataTypeCreateError(_) | Self::CodecsCreateError(_) => {
                ArrayErrorKind::Unsupported
            }
            Self::NodePathError(_)
            | Self::InvalidFillValueMetadata(_)
            | Self::InvalidChunkShapeDimensionality(..)
            | Self::InvalidMetadata(..) => ArrayErrorKind::Format,
        }
    }
}
