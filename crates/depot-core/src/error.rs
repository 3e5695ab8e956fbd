//! # Error Taxonomy
//!
//! The four failure classes of the ingestion and retrieval pipelines. Each
//! variant carries an explicit [`ErrorKind`] and HTTP status so the transport
//! layer maps errors by tag, never by inspecting the concrete cause.

use thiserror::Error;

/// Machine-readable error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or empty batch, non-string URI, disallowed MIME type.
    Validation,
    /// URI not in the index, or index entry whose blob is missing on disk.
    NotFound,
    /// Recomputed digest differs from the recorded digest.
    Integrity,
    /// Underlying I/O failure.
    Storage,
}

impl ErrorKind {
    /// Stable code string used in JSON error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Integrity => "INTEGRITY_ERROR",
            Self::Storage => "STORAGE_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type shared by the store and pipeline layers.
#[derive(Error, Debug)]
pub enum DepotError {
    /// Request rejected before any side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested artifact or its backing blob does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored bytes no longer match the digest recorded at ingestion.
    #[error("integrity violation for {uri}: expected {expected}, found {actual}")]
    Integrity {
        /// URI of the corrupted artifact.
        uri: String,
        /// Digest recorded at ingestion (hex).
        expected: String,
        /// Digest recomputed from the bytes on disk (hex).
        actual: String,
    },

    /// I/O failure while reading or writing a blob.
    #[error("storage error during {operation}: {source}")]
    Storage {
        /// What the store was doing (e.g. "write", "create partition").
        operation: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl DepotError {
    /// Wrap an I/O error raised during `operation`.
    pub fn storage(operation: &'static str, source: std::io::Error) -> Self {
        Self::Storage { operation, source }
    }

    /// Return the error class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// HTTP status code for this error class.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Integrity => 400,
            ErrorKind::Storage => 500,
        }
    }
}
