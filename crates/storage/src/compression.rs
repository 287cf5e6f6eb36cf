//! Compression configuration and codecs
//!
//! Each backend owns its codec: gzip for the textual backend, zstd for the
//! binary one. Compression only changes the on-disk suffix.

use gaitstore_core::{Error, Result};
use std::io::{Read, Write};
use std::path::Path;

/// Default zstd compression level (3 = fast with good compression)
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Default gzip compression level
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// Compression configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Compression level passed to the backend's codec
    pub level: i32,
}

impl CompressionConfig {
    pub const fn gzip() -> Self {
        Self {
            level: DEFAULT_GZIP_LEVEL as i32,
        }
    }

    pub const fn zstd() -> Self {
        Self {
            level: DEFAULT_ZSTD_LEVEL,
        }
    }
}

/// Compression algorithm used by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Gzip,
    Zstd,
}

impl Codec {
    pub fn compress(self, data: &[u8], config: CompressionConfig, path: &Path) -> Result<Vec<u8>> {
        match self {
            Codec::Gzip => {
                let level = flate2::Compression::new(config.level.clamp(0, 9) as u32);
                let mut encoder = flate2::write::GzEncoder::new(Vec::new(), level);
                encoder
                    .write_all(data)
                    .map_err(|e| Error::compression(path, "gzip compression", e))?;
                encoder
                    .finish()
                    .map_err(|e| Error::compression(path, "gzip compression", e))
            }
            Codec::Zstd => zstd::stream::encode_all(data, config.level)
                .map_err(|e| Error::compression(path, "zstd compression", e)),
        }
    }

    pub fn decompress(self, data: &[u8], path: &Path) -> Result<Vec<u8>> {
        match self {
            Codec::Gzip => {
                let mut decoder = flate2::read::GzDecoder::new(data);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| Error::compression(path, "gzip decompression", e))?;
                Ok(out)
            }
            Codec::Zstd => zstd::stream::decode_all(data)
                .map_err(|e| Error::compression(path, "zstd decompression", e)),
        }
    }
}
