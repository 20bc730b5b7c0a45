//! Storage engine error types.
//!
//! Defines [`StorageError`], covering every failure the storage engine can
//! report. Each variant maps onto a [`holydb_core::ErrorClass`] through
//! [`StorageError::class`], which is all the request boundary needs to choose a
//! status code.
//!
//! # Usage
//!
//! ```
//! use holydb_core::ErrorClass;
//! use holydb_storage::error::StorageError;
//!
//! let err = StorageError::NoSuchKey {
//!     bucket: "photos".to_owned(),
//!     key: "2024/cat.jpg".to_owned(),
//! };
//! assert_eq!(err.class(), ErrorClass::NotFound);
//! ```

use holydb_core::ErrorClass;

/// Storage engine error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    // -----------------------------------------------------------------------
    // Not found
    // -----------------------------------------------------------------------
    /// The object has no parts.
    #[error("no parts found for object {bucket}/{key}")]
    NoSuchKey {
        /// The bucket that was searched.
        bucket: String,
        /// The key that was not found.
        key: String,
    },

    /// The object has no metadata record.
    #[error("no metadata found for object {bucket}/{key}")]
    NoSuchMetadata {
        /// The bucket that was searched.
        bucket: String,
        /// The key whose metadata was not found.
        key: String,
    },

    /// The bucket-level settings file was never written.
    #[error("no bucket metadata found for bucket {bucket}")]
    NoSuchBucketMetadata {
        /// The bucket that was searched.
        bucket: String,
    },

    /// The multipart staging area does not exist.
    #[error("the specified upload does not exist: {bucket}/{upload_id}")]
    NoSuchUpload {
        /// The bucket the upload belongs to.
        bucket: String,
        /// The upload ID that was not found.
        upload_id: String,
    },

    // -----------------------------------------------------------------------
    // Rejected before mutation
    // -----------------------------------------------------------------------
    /// The request was rejected before touching the filesystem.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Why the request was rejected.
        message: String,
    },

    // -----------------------------------------------------------------------
    // Internal / catch-all
    // -----------------------------------------------------------------------
    /// Filesystem or encoding failure, with its cause.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StorageError {
    /// Build an [`StorageError::InvalidRequest`] from any message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// The error class this failure belongs to.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoSuchKey { .. }
            | Self::NoSuchMetadata { .. }
            | Self::NoSuchBucketMetadata { .. }
            | Self::NoSuchUpload { .. } => ErrorClass::NotFound,
            Self::InvalidRequest { .. } => ErrorClass::InvalidRequest,
            Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Whether this error means the addressed entity does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }
}

/// Convenience result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
