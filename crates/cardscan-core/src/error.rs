use std::path::Path;

use thiserror::Error;

/// Canonical error type for rotation operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Operation violates current state machine rules.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Human-readable explanation of the invalid state.
        message: String,
    },

    /// Unexpected internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },

    /// I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error occurred.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Writing the archive container failed. The attempted archive file has
    /// been discarded and the source bucket is left intact.
    #[error("failed to archive bucket `{bucket}`: {message}")]
    ArchiveWrite {
        /// Name of the bucket whose archival failed.
        bucket: String,
        /// Underlying failure details.
        message: String,
    },

    /// The archive was written but the source bucket could not be removed.
    /// The archive exists redundantly alongside the still-present source, so
    /// the bucket may be re-archived on the next sweep.
    #[error("archived bucket `{bucket}` to `{archive}` but failed to remove source: {message}")]
    SourceRemoval {
        /// Name of the bucket that could not be removed.
        bucket: String,
        /// Path of the archive that was successfully written.
        archive: String,
        /// Underlying failure details.
        message: String,
    },
}

impl CoreError {
    /// Creates an `InvalidState` variant.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an `ArchiveWrite` variant.
    #[must_use]
    pub fn archive_write(bucket: impl Into<String>, message: impl ToString) -> Self {
        Self::ArchiveWrite {
            bucket: bucket.into(),
            message: message.to_string(),
        }
    }

    /// Creates a `SourceRemoval` variant.
    #[must_use]
    pub fn source_removal(bucket: impl Into<String>, archive: &Path, message: impl ToString) -> Self {
        Self::SourceRemoval {
            bucket: bucket.into(),
            archive: archive.display().to_string(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Convenient result alias for rotation operations.
pub type CoreResult<T> = Result<T, CoreError>;
