//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while writing outputs and integrity records.
///
/// Reads are fail-safe and never produce these: an unreadable record is a
/// cache miss. Only the write path reports errors, because a write that fails
/// must abort the module that requested it.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing a file.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A staged output could not be renamed into place.
    #[error("failed to move staged output into {path}: {source}")]
    Persist {
        /// The target path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An input stamp could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl CacheError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
