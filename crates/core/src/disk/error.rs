//! Remote disk error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur during remote disk operations.
#[derive(Debug, Error)]
pub enum DiskError {
    /// Logical path has no metadata record.
    #[error("file not found: {path}")]
    NotFound {
        /// Logical path that was looked up.
        path: String,
    },

    /// A blob container call failed. The backend error is kept unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The backend answered a delete without actually removing the object.
    #[error("failed to delete file in blob storage: {id}")]
    DeletionNotConfirmed {
        /// Remote object id whose deletion was not confirmed.
        id: String,
    },

    /// Operation not allowed in the current state (write after finalize, ...).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Logical path is not acceptable to the metadata store.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Seek to a negative offset.
    #[error("cannot seek to negative offset {offset}")]
    InvalidSeek {
        /// Resulting offset.
        offset: i128,
    },

    /// A ranged read kept returning fewer bytes than the object holds.
    #[error("short read from {id} at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Remote object id.
        id: String,
        /// Offset inside the object.
        offset: u64,
        /// Bytes requested.
        expected: u64,
        /// Bytes received.
        actual: u64,
    },

    /// `read_exact` hit the end of the file.
    #[error("unexpected end of file at offset {offset}")]
    UnexpectedEof {
        /// Logical offset where the data ran out.
        offset: u64,
    },

    /// Disk settings are missing or invalid.
    #[error("disk configuration error: {0}")]
    Configuration(String),

    /// Metadata store failure.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// A read executor task failed to complete.
    #[error("read executor error: {0}")]
    Executor(String),
}

impl DiskError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a deletion not confirmed error.
    #[must_use]
    pub fn deletion_not_confirmed(id: impl Into<String>) -> Self {
        Self::DeletionNotConfirmed { id: id.into() }
    }

    /// Create an invalid state error.
    #[must_use]
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create an invalid path error.
    #[must_use]
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a metadata error.
    #[must_use]
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Whether this error came from the blob container.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_is_kept_unchanged() {
        let err: DiskError = StorageError::operation("quota exceeded").into();
        assert!(err.is_storage());
        assert_eq!(err.to_string(), "storage operation failed: quota exceeded");
        assert!(matches!(
            err,
            DiskError::Storage(StorageError::Operation(ref msg)) if msg == "quota exceeded"
        ));
    }

    #[test]
    fn test_deletion_not_confirmed_names_object() {
        let err = DiskError::deletion_not_confirmed("store/data.bin_abcdEFGH");
        assert_eq!(
            err.to_string(),
            "failed to delete file in blob storage: store/data.bin_abcdEFGH"
        );
        assert!(!err.is_storage());
    }
}
