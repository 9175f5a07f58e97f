use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Configuration;

/// Zarr V2 codec metadata with an `id` and flattened configuration fields.
///
/// For example:
/// ```json
/// {
///     "id": "zlib",
///     "level": 5
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct MetadataV2 {
    id: String,
    #[serde(flatten)]
    configuration: Configuration,
}

impl MetadataV2 {
    /// Create codec metadata from an `id` and a serializable configuration.
    ///
    /// # Errors
    /// Returns a [`serde_json`] error if `configuration` does not serialize to a JSON object.
    pub fn new_with_serializable_configuration<TConfiguration: Serialize>(
        id: impl Into<String>,
        configuration: &TConfiguration,
    ) -> Result<Self, Arc<serde_json::Error>> {
        let configuration = serde_json::to_value(configuration).map_err(Arc::new)?;
        let configuration = match configuration {
            serde_json::Value::Object(map) => map,
            _ => {
                return Err(Arc::new(<serde_json::Error as serde::ser::Error>::custom(
                    "codec configuration must be a JSON object",
                )))
            }
        };
        Ok(Self {
            id: id.into(),
            configuration: configuration.into(),
        })
    }

    /// Return the value of the `id` field.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the configuration, which includes all fields excluding the `id`.
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Try and convert the configuration to a specific serializable configuration.
    ///
    /// # Errors
    /// Returns a [`serde_json`] error if the metadata cannot be converted.
    pub fn to_typed_configuration<TConfiguration: DeserializeOwned>(
        &self,
    ) -> Result<TConfiguration, Arc<serde_json::Error>> {
        self.configuration.to_typed()
    }
}
