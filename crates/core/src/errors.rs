use std::path::PathBuf;

/// Result type alias for gaitstore operations
pub type Result<T> = std::result::Result<T, Error>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for gaitstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A keyed artifact or record does not exist
    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: String },

    /// A storage backend name that is not registered
    #[error("unknown storage backend '{name}' (registered: {registered})")]
    UnknownBackend { name: String, registered: String },

    /// Configuration or caller misuse
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Encode/decode failure
    #[error("failed to {operation} '{key}': {source}")]
    Serialization {
        key: String,
        operation: String,
        #[source]
        source: BoxedSource,
    },

    /// Compression or decompression failure
    #[error("{operation} failed for '{path}': {source}")]
    Compression {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Uniqueness or foreign-key breach
    #[error("constraint violation during {operation}: {message}")]
    ConstraintViolation { operation: String, message: String },

    /// Checksum mismatch on verify or restore
    #[error("integrity check failed for '{artifact}': expected {expected}, found {actual}")]
    Integrity {
        artifact: String,
        expected: String,
        actual: String,
    },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Relational store failures other than constraint breaches
    #[error("database {operation} failed: {source}")]
    Database {
        operation: String,
        #[source]
        source: BoxedSource,
    },

    /// Data and sidecar could not both be removed
    #[error("partial delete of '{key}': {message}")]
    PartialDelete { key: String, message: String },
}

// Conversion implementations
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Serialization {
            key: String::new(),
            operation: "process JSON".to_string(),
            source: Box::new(error),
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a not-found error for a record or artifact kind
    #[must_use]
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Create an unknown backend error listing the registered names
    #[must_use]
    pub fn unknown_backend(name: impl Into<String>, registered: &[&str]) -> Self {
        Error::UnknownBackend {
            name: name.into(),
            registered: registered.join(", "),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(
        key: impl Into<String>,
        operation: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Error::Serialization {
            key: key.into(),
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Create a compression error
    #[must_use]
    pub fn compression(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::Compression {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a constraint violation error
    #[must_use]
    pub fn constraint_violation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConstraintViolation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an integrity error from a checksum mismatch
    #[must_use]
    pub fn integrity(
        artifact: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Error::Integrity {
            artifact: artifact.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a database error
    #[must_use]
    pub fn database(operation: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Error::Database {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Create a partial delete error
    #[must_use]
    pub fn partial_delete(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::PartialDelete {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether this error reports a missing record or artifact
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
