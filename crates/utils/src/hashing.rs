//! Stable digests for deduplication and integrity checks

use gaitstore_core::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const READ_CHUNK: usize = 8192;

/// Hash any serializable value so that logically equal values hash equally
///
/// The value is encoded as JSON with object keys sorted recursively, so
/// field order and map insertion order never influence the digest.
pub fn stable_hash<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut hasher = ContentHasher::new();
    hasher.hash_content(value)?;
    Ok(hasher.finalize())
}

/// SHA-256 of a byte slice as lowercase hex
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 of a file's content, streamed
pub fn hash_file(path: &Path) -> Result<String> {
    let mut hasher = ContentHasher::new();
    hasher.update_file(path)?;
    Ok(hasher.finalize())
}

/// Incremental SHA-256 hasher over bytes, files and structured values
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    hasher: Sha256,
    bytes_hashed: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.bytes_hashed += bytes.len() as u64;
    }

    /// Feed the canonical JSON encoding of a value
    pub fn hash_content<T: Serialize + ?Sized>(&mut self, content: &T) -> Result<()> {
        let value = serde_json::to_value(content)
            .map_err(|e| Error::serialization("content", "encode for hashing", e))?;
        let canonical = serde_json::to_vec(&canonicalize(value))
            .map_err(|e| Error::serialization("content", "encode for hashing", e))?;
        self.update_bytes(&canonical);
        Ok(())
    }

    /// Feed a file's bytes in fixed-size chunks, returning the bytes read
    pub fn update_file(&mut self, path: &Path) -> Result<u64> {
        let file = File::open(path).map_err(|e| Error::file_system(path, "open file for hashing", e))?;
        let mut reader = BufReader::with_capacity(READ_CHUNK, file);
        let mut buffer = [0u8; READ_CHUNK];
        let mut total = 0u64;

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .map_err(|e| Error::file_system(path, "read file chunk for hashing", e))?;
            if bytes_read == 0 {
                break;
            }
            self.update_bytes(&buffer[..bytes_read]);
            total += bytes_read as u64;
        }

        Ok(total)
    }

    /// Total bytes fed so far
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    /// Consume the hasher and return the lowercase hex digest
    pub fn finalize(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
