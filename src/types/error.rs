//! Error types for news thread operations.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use thiserror::Error;

/// Error type shared by the store, the vector indexes, the models and the repository.
///
/// Public repository entry points never surface these to callers; they are
/// logged and mapped to an internal-error outcome instead.
#[derive(Error, Debug)]
pub enum ThreadsError {
    /// Configuration is missing, malformed or inconsistent
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid key format in a column family
    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    /// Vector index file or in-memory index failure
    #[error("Index error: {0}")]
    IndexError(String),

    /// Model file could not be loaded or produced malformed output
    #[error("Model error: {0}")]
    ModelError(String),

    /// Raw document could not be turned into a `Document`
    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    /// Worker shard failed during parallel processing
    #[error("Worker failed: {0}")]
    WorkerError(String),

    /// Storage layer error (RocksDB)
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML configuration parse error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Bincode serialization error
    #[error("Bincode error: {0}")]
    BincodeError(#[from] bincode::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ThreadsError {
    /// Create configuration error with message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create index error with message.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create model error with message.
    pub fn model(msg: impl Into<String>) -> Self {
        Self::ModelError(msg.into())
    }

    /// Create extraction error with message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::ExtractionError(msg.into())
    }

    /// Create internal error with message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ThreadsError::config("no languages configured");
        assert_eq!(err.to_string(), "Configuration error: no languages configured");

        let err = ThreadsError::index("dimension mismatch");
        assert_eq!(err.to_string(), "Index error: dimension mismatch");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ThreadsError = io.into();
        assert!(matches!(err, ThreadsError::IoError(_)));
    }
}
