use serde::{Deserialize, Serialize};

use crate::Attributes;

/// Zarr V2 group metadata, stored in `.zgroup`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct GroupMetadataV2 {
    /// An integer defining the version of the storage specification to which the group adheres. Must be `2`.
    pub zarr_format: monostate::MustBe!(2u64),
    /// Attributes, stored separately in `.zattrs`.
    #[serde(skip)]
    pub attributes: Attributes,
}

impl GroupMetadataV2 {
    /// Create Zarr V2 group metadata with `attributes`.
    #[must_use]
    pub fn new(attributes: Attributes) -> Self {
        Self {
            zarr_format: Default::default(),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_metadata_v2() {
        let metadata: GroupMetadataV2 = serde_json::from_str(r#"{"zarr_format": 2}"#).unwrap();
        assert_eq!(metadata, GroupMetadataV2::default());
        assert!(serde_json::from_str::<GroupMetadataV2>(r#"{"zarr_format": 3}"#).is_err());
        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"zarr_format":2}"#
        );
    }
}
