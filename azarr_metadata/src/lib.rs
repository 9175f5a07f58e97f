//! Zarr V2 metadata support for the `azarr` crate.
//!
//! This crate supports serialisation and deserialisation of:
//!  - Zarr V2 array metadata (`.zarray`),
//!  - Zarr V2 group metadata (`.zgroup`),
//!  - Zarr V2 attributes (`.zattrs`),
//!  - Zarr V2 codec metadata (compressors and filters), and
//!  - consolidated metadata documents (`.zmetadata`).
//!
//! Metadata is validated structurally (e.g. `zarr_format` must be `2`, chunk shape entries must be non-zero).
//! Interpreting data types, fill values and codecs is the responsibility of `azarr`.
//!
//! ## Licence
//! `azarr_metadata` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

pub mod v2;

use std::sync::Arc;

use derive_more::{Deref, From, Into};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Attributes of an array or group, stored in `.zattrs`.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// A configuration: a JSON object of arbitrary fields.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default, Deref, From, Into)]
pub struct Configuration(serde_json::Map<String, serde_json::Value>);

impl Configuration {
    /// Try and convert the configuration to a specific serializable configuration.
    ///
    /// # Errors
    /// Returns a [`serde_json`] error if the configuration cannot be converted.
    pub fn to_typed<TConfiguration: DeserializeOwned>(
        &self,
    ) -> Result<TConfiguration, Arc<serde_json::Error>> {
        serde_json::from_value(serde_json::Value::Object(self.0.clone())).map_err(Arc::new)
    }
}

/// The endianness of each element in an array.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Endianness {
    /// Little endian.
    Little,
    /// Big endian.
    Big,
}

impl Endianness {
    /// The endianness of the current platform.
    pub const NATIVE: Self = if cfg!(target_endian = "big") {
        Self::Big
    } else {
        Self::Little
    };

    /// Returns true if this is the native endianness of the current platform.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == Self::NATIVE
    }
}

/// The separator between chunk indices in a chunk key.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum ChunkKeySeparator {
    /// The `.` separator, e.g. `0.1.2`.
    #[default]
    #[serde(rename = ".")]
    Dot,
    /// The `/` separator, e.g. `0/1/2`.
    #[serde(rename = "/")]
    Slash,
}

impl ChunkKeySeparator {
    /// Returns the separator as a [`char`].
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Dot => '.',
            Self::Slash => '/',
        }
    }
}
