//! Error types for manifest loading and validation.

use std::path::PathBuf;

use relo_common::{NamespaceError, ParseModuleError};

/// Errors that can occur when loading or validating a `relocate.toml` manifest.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The manifest file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The manifest path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The TOML content could not be parsed into a manifest.
    #[error("invalid manifest syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required field is missing or empty.
    #[error("missing required field `{0}`")]
    MissingField(String),

    /// `relocation.namespace` is not a dotted Java package name.
    #[error("relocation.namespace: {0}")]
    Namespace(#[from] NamespaceError),

    /// A `group:name:version` string is malformed.
    #[error("{context}: {source}")]
    Coordinate {
        /// Where the coordinate appeared.
        context: String,
        /// The parse failure.
        source: ParseModuleError,
    },

    /// Any other rule violation.
    #[error("invalid manifest: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("relocation.namespace".to_string());
        assert_eq!(err.to_string(), "missing required field `relocation.namespace`");
    }

    #[test]
    fn display_coordinate() {
        let err = ConfigError::Coordinate {
            context: "relocation.roots entry".to_string(),
            source: ParseModuleError("g:a".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "relocation.roots entry: invalid module coordinate `g:a` (expected `group:name:version`)"
        );
    }

    #[test]
    fn display_read_names_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("/w/relocate.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        assert_eq!(err.to_string(), "cannot read /w/relocate.toml: file not found");
    }
}
