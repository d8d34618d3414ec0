//! Parsing and validation of `relocate.toml` relocation manifests.
//!
//! This crate reads the manifest and produces a strongly-typed
//! [`RelocationConfig`], then resolves it against the manifest's directory
//! into a [`ResolvedRelocation`] with parsed coordinates and absolute paths.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_relocation, ResolvedLibrary, ResolvedRelocation};
pub use types::*;
