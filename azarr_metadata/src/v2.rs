//! Zarr V2 metadata.

mod array;
mod consolidated;
mod group;
mod metadata;

pub use array::{
    ArrayMetadataV2, ArrayMetadataV2Order, DataTypeMetadataV2, DataTypeMetadataV2EndiannessError,
    DataTypeMetadataV2StructuredField, FillValueMetadataV2,
};
pub use consolidated::ConsolidatedMetadataV2;
pub use group::GroupMetadataV2;
pub use metadata::MetadataV2;

/// The default key of a consolidated metadata document.
pub const DEFAULT_CONSOLIDATED_METADATA_KEY: &str = ".zmetadata";

/// The key suffix of Zarr V2 array metadata.
pub const ARRAY_METADATA_KEY: &str = ".zarray";

/// The key suffix of Zarr V2 group metadata.
pub const GROUP_METADATA_KEY: &str = ".zgroup";

/// The key suffix of Zarr V2 attributes.
pub const ATTRIBUTES_KEY: &str = ".zattrs";
