//! Shared helpers for CLI commands.
//!
//! Manifest discovery, the manifest-backed artifact resolver, and namespace
//! parsing.

use std::path::{Path, PathBuf};

use relo_common::Namespace;
use relo_config::{ResolvedRelocation, CONFIG_FILE};
use relo_graph::{Component, StaticResolver};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing
/// `relocate.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Locates the manifest file from global CLI args.
///
/// If `--config` is specified, uses that path (directory → its
/// `relocate.toml`). Otherwise walks up from the current directory.
pub fn resolve_manifest_path(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match global.config {
        Some(ref config_path) => {
            let p = PathBuf::from(config_path);
            if p.is_dir() {
                Ok(p.join(CONFIG_FILE))
            } else {
                Ok(p)
            }
        }
        None => Ok(find_project_root(&std::env::current_dir()?)?.join(CONFIG_FILE)),
    }
}

/// The directory relative manifest paths are anchored at.
pub fn manifest_dir(manifest: &Path) -> PathBuf {
    match manifest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Builds the artifact resolver for a resolved manifest.
///
/// Every library becomes a component; platform libraries carry no artifact.
pub fn manifest_resolver(relocation: &ResolvedRelocation) -> StaticResolver {
    let mut resolver = StaticResolver::new();
    for lib in &relocation.libraries {
        resolver = resolver.with_component(Component {
            module: lib.module.clone(),
            artifact: lib.artifact.clone(),
            platform: lib.platform,
            already_remapped: lib.remapped,
            dependencies: lib.dependencies.clone(),
        });
        if let Some(sources) = &lib.sources {
            resolver = resolver.with_sources(lib.module.clone(), sources.clone());
        }
    }
    resolver
}

/// Parses a dotted namespace argument.
pub fn parse_namespace(text: &str) -> Result<Namespace, Box<dyn std::error::Error>> {
    Ok(Namespace::new(text)?)
}
