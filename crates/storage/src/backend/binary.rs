//! Opaque binary backend: bincode behind a small header, optionally zstd-compressed
//!
//! bincode is not self-describing, so values must round-trip through their
//! concrete type. Dynamic values such as `serde_json::Value` belong in the
//! JSON backend.

use crate::compression::{Codec, CompressionConfig};
use gaitstore_core::{Error, Result, BINARY_BACKEND};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Magic bytes at the start of every binary artifact: "GSB" + format version
const BINARY_MAGIC: [u8; 4] = *b"GSB\x01";

#[derive(Debug, Clone)]
pub struct BinaryBackend {
    compression: CompressionConfig,
}

impl BinaryBackend {
    pub const NAME: &'static str = BINARY_BACKEND;
    pub const EXTENSION: &'static str = ".bin";
    pub const COMPRESSED_EXTENSION: &'static str = ".bin.zst";
    pub const CODEC: Codec = Codec::Zstd;

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
        let payload =
            bincode::serialize(value).map_err(|e| Error::serialization(key, "encode binary", e))?;
        let mut bytes = Vec::with_capacity(BINARY_MAGIC.len() + payload.len());
        bytes.extend_from_slice(&BINARY_MAGIC);
        bytes.extend_from_slice(&payload);
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

        let payload = bytes.strip_prefix(&BINARY_MAGIC[..]).ok_or_else(|| {
            Error::serialization(
                key,
                "decode binary",
                format!("missing header magic in {}", path.display()),
            )
        })?;

        bincode::deserialize(payload).map_err(|e| Error::serialization(key, "decode binary", e))
    }
}

impl Default for BinaryBackend {
    fn default() -> Self {
        Self::new(CompressionConfig::zstd())
    }
}
