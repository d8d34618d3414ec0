//! Shared foundational types used across the relo relocation toolchain.
//!
//! This crate provides library coordinates ([`Module`]), validated relocation
//! namespaces ([`Namespace`]), and content fingerprints used for cache
//! invalidation ([`ContentHash`]).

#![warn(missing_docs)]

pub mod hash;
pub mod module;
pub mod namespace;

pub use hash::{ContentHash, ContentHasher};
pub use module::{CoordinateScheme, Module, ParseModuleError};
pub use namespace::{Namespace, NamespaceError};

/// Version of the relo toolchain, mixed into every input fingerprint so that a
/// new release regenerates previously relocated artifacts.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
