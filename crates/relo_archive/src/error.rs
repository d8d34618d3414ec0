//! Error types for archive reading and writing.

use std::path::PathBuf;

/// Errors produced while decoding or encoding an archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// An archive file could not be opened or created.
    #[error("cannot open archive {path}: {source}")]
    Open {
        /// The archive path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An I/O error while reading or writing archive data.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The container structure is invalid.
    #[error("malformed archive: {reason}")]
    Malformed {
        /// What was wrong.
        reason: String,
    },

    /// The archive uses a feature this codec does not implement.
    #[error("unsupported archive feature in `{entry}`: {feature}")]
    Unsupported {
        /// The entry using the feature, or `<archive>` for container-level features.
        entry: String,
        /// Description of the feature.
        feature: String,
    },

    /// The decompressed data does not match the recorded checksum.
    #[error("CRC mismatch in `{entry}`: expected {expected:08x}, got {actual:08x}")]
    CrcMismatch {
        /// The entry name.
        entry: String,
        /// Checksum recorded in the central directory.
        expected: u32,
        /// Checksum of the decompressed data.
        actual: u32,
    },

    /// The decompressed data does not have the recorded size.
    #[error("size mismatch in `{entry}`: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// The entry name.
        entry: String,
        /// Size recorded in the central directory.
        expected: u64,
        /// Actual decompressed size.
        actual: u64,
    },

    /// A second entry with the same name was added to a writer.
    #[error("duplicate archive entry `{0}`")]
    DuplicateEntry(String),

    /// A named entry does not exist.
    #[error("archive entry `{0}` not found")]
    EntryNotFound(String),
}

impl ArchiveError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(entry: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            entry: entry.into(),
            feature: feature.into(),
        }
    }
}
