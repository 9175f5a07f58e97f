use serde::{Deserialize, Serialize};

/// A consolidated metadata document, typically stored at `.zmetadata`.
///
/// Holds the metadata of every array and group in a hierarchy so it can be read with a single request.
/// For example:
/// ```json
/// {
///     "zarr_consolidated_format": 1,
///     "metadata": {
///         ".zgroup": {"zarr_format": 2},
///         "temperature/.zarray": {"zarr_format": 2, "...": "..."},
///         "temperature/.zattrs": {"units": "K"}
///     }
/// }
/// ```
///
/// The format version is not validated on deserialisation, so that readers can report an unsupported version distinctly from malformed JSON.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ConsolidatedMetadataV2 {
    /// The consolidated metadata format version. Only version `1` is supported.
    pub zarr_consolidated_format: u64,
    /// A mapping from store key to the JSON value stored at that key.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ConsolidatedMetadataV2 {
    /// The supported consolidated metadata format version.
    pub const SUPPORTED_FORMAT: u64 = 1;

    /// Create a consolidated metadata document (format version `1`) from a mapping of store keys to metadata.
    #[must_use]
    pub fn new(metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            zarr_consolidated_format: Self::SUPPORTED_FORMAT,
            metadata,
        }
    }

    /// Returns true if the format version is supported.
    #[must_use]
    pub fn is_supported_format(&self) -> bool {
        self.zarr_consolidated_format == Self::SUPPORTED_FORMAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consolidated_metadata_v2() {
        let json = r#"{
            "metadata": {
                ".zgroup": {"zarr_format": 2},
                "a/.zattrs": {"units": "m"}
            },
            "zarr_consolidated_format": 1
        }"#;
        let consolidated: ConsolidatedMetadataV2 = serde_json::from_str(json).unwrap();
        assert!(consolidated.is_supported_format());
        assert_eq!(consolidated.metadata.len(), 2);
        assert_eq!(consolidated.metadata["a/.zattrs"]["units"], "m");
    }

    #[test]
    fn consolidated_metadata_v2_unsupported_format() {
        let consolidated: ConsolidatedMetadataV2 =
            serde_json::from_str(r#"{"metadata": {}, "zarr_consolidated_format": 2}"#).unwrap();
        assert!(!consolidated.is_supported_format());
        assert!(serde_json::from_str::<ConsolidatedMetadataV2>(r#"{"metadata": {}}"#).is_err());
    }
}
