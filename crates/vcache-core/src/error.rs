//! Error types for the cache pipeline.

use std::path::Path;

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised by the remote source, local copies, configuration and metrics.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Remote object does not exist.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// Credentials were rejected by the object store.
    #[error("access denied: {message}")]
    AccessDenied { message: String },

    /// Network or protocol failure talking to the object store.
    #[error("remote error for {key}: {message}")]
    Remote { key: String, message: String },

    /// Failure reading or replacing a local materialized copy.
    #[error("local I/O error at {path}: {message}")]
    LocalIo { path: String, message: String },

    /// Missing or invalid configuration.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Metric registration failed.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl CacheError {
    /// Returns true if this error indicates the remote object was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the error should terminate the process when hit during startup.
    ///
    /// Failures during polling never stop a refresh loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::AccessDenied { .. } | Self::Metrics(_)
        )
    }

    /// Create from an object_store error with context about the key.
    pub fn from_object_store(err: object_store::Error, key: &str) -> Self {
        match &err {
            object_store::Error::NotFound { .. } => CacheError::NotFound {
                key: key.to_string(),
            },
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => CacheError::AccessDenied {
                message: err.to_string(),
            },
            _ => CacheError::Remote {
                key: key.to_string(),
                message: err.to_string(),
            },
        }
    }

    pub(crate) fn local_io(path: &Path, err: std::io::Error) -> Self {
        CacheError::LocalIo {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        CacheError::Config {
            message: message.into(),
        }
    }
}
