//! Storage error types.

use thiserror::Error;

/// Blob container operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Blob not found in the container.
    #[error("blob not found: {key}")]
    NotFound {
        /// Blob name that was not found.
        key: String,
    },

    /// Commit referenced blocks that were not staged, or staged out of order.
    #[error("block list for {key} does not match the staged blocks")]
    InvalidBlockList {
        /// Blob the commit was issued for.
        key: String,
    },

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Backend operation error (network, auth, quota, ...).
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an invalid block list error.
    #[must_use]
    pub fn invalid_block_list(key: impl Into<String>) -> Self {
        Self::InvalidBlockList { key: key.into() }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            opendal::ErrorKind::ConfigInvalid => Self::Configuration(err.to_string()),
            _ => Self::Operation(err.to_string()),
        }
    }
}
