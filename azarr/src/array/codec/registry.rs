use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use azarr_metadata::v2::MetadataV2;

use super::BytesToBytesCodecTraits;

/// A function creating a bytes to bytes codec from its Zarr V2 metadata.
pub type CodecCreateFn =
    fn(&MetadataV2) -> Result<Arc<dyn BytesToBytesCodecTraits>, CodecCreateError>;

/// A codec creation error.
#[derive(Clone, Debug, Error)]
pub enum CodecCreateError {
    /// No codec is registered for the `id`.
    #[error("unsupported codec {0}")]
    UnsupportedCodec(String),
    /// The codec configuration is invalid.
    #[error("invalid {0} codec configuration: {1}")]
    InvalidConfiguration(String, String),
}

/// A registry of codec constructors keyed by codec `id`.
///
/// Arrays resolve their compressor and filters through the registry they are opened with.
/// [`CodecRegistry::default`] holds the codecs enabled by crate features; [`CodecRegistry::new`] is empty.
///
/// ```rust
/// # use azarr::array::codec::CodecRegistry;
/// let registry = CodecRegistry::default();
/// # #[cfg(feature = "gzip")]
/// assert!(registry.contains("gzip"));
/// ```
#[derive(Clone, Debug)]
pub struct CodecRegistry {
    constructors: HashMap<String, CodecCreateFn>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        #[cfg(feature = "gzip")]
        registry.register(super::gzip::GZIP, super::gzip::create_codec_gzip);
        #[cfg(feature = "zlib")]
        registry.register(super::zlib::ZLIB, super::zlib::create_codec_zlib);
        registry
    }
}

impl CodecRegistry {
    /// Create an empty codec registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a codec constructor for `id`, returning the constructor it replaces (if any).
    pub fn register(&mut self, id: impl Into<String>, create: CodecCreateFn) -> Option<CodecCreateFn> {
        self.constructors.insert(id.into(), create)
    }

    /// Register a codec constructor for `id`.
    #[must_use]
    pub fn with_codec(mut self, id: impl Into<String>, create: CodecCreateFn) -> Self {
        self.register(id, create);
        self
    }

    /// Returns true if a codec is registered for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    /// Create a codec from its metadata.
    ///
    /// # Errors
    /// Returns [`CodecCreateError`] if no codec is registered for the metadata `id` or its configuration is invalid.
    pub fn create(
        &self,
        metadata: &MetadataV2,
    ) -> Result<Arc<dyn BytesToBytesCodecTraits>, CodecCreateError> {
        let create = self
            .constructors
            .get(metadata.id())
            .ok_or_else(|| CodecCreateError::UnsupportedCodec(metadata.id().to_string()))?;
        create(metadata)
    }
}
