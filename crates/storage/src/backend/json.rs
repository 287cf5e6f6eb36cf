//! Textual backend: pretty JSON, optionally gzip-compressed

use crate::compression::{Codec, CompressionConfig};
use gaitstore_core::{Error, Result, JSON_BACKEND};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct JsonBackend {
    compression: CompressionConfig,
}

impl JsonBackend {
    pub const NAME: &'static str = JSON_BACKEND;
    pub const EXTENSION: &'static str = ".json";
    pub const COMPRESSED_EXTENSION: &'static str = ".json.gz";
    pub const CODEC: Codec = Codec::Gzip;

    pub fn new(compression: CompressionConfig) -> Self {
        Self { compression }
    }

    pub fn encode<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        compressed: bool,
        path: &Path,
    ) -> Result<Vec<u8>> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| Error::serialization(key, "encode JSON", e))?;
        if compressed {
            Self::CODEC.compress(&bytes, self.compression, path)
        } else {
            Ok(bytes)
        }
    }

    pub fn decode<T: DeserializeOwned>(
        &self,
        key: &str,
        bytes: &[u8],
        compressed: bool,
        path: &Path,
    ) -> Result<T> {
        let plain;
        let bytes = if compressed {
            plain = Self::CODEC.decompress(bytes, path)?;
            plain.as_slice()
        } else {
            bytes
        };
        serde_json::from_slice(bytes).map_err(|e| Error::serialization(key, "decode JSON", e))
    }
}

impl Default for JsonBackend {
    fn default() -> Self {
        Self::new(CompressionConfig::gzip())
    }
}
