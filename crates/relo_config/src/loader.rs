//! Configuration file loading and validation.

use std::collections::HashSet;
use std::path::Path;

use relo_common::{Module, Namespace};

use crate::error::ConfigError;
use crate::types::RelocationConfig;

/// File name of the relocation manifest.
pub const CONFIG_FILE: &str = "relocate.toml";

/// Loads and validates `relocate.toml` from a directory.
pub fn load_config(dir: &Path) -> Result<RelocationConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE))
}

/// Loads and validates a manifest from an explicit path.
pub fn load_config_file(path: &Path) -> Result<RelocationConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a manifest from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<RelocationConfig, ConfigError> {
    let config: RelocationConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates required fields, coordinate syntax and uniqueness.
fn validate_config(config: &RelocationConfig) -> Result<(), ConfigError> {
    let relocation = &config.relocation;
    if relocation.namespace.is_empty() {
        return Err(ConfigError::MissingField("relocation.namespace".to_string()));
    }
    Namespace::new(&relocation.namespace)?;
    if relocation.jobs == Some(0) {
        return Err(ConfigError::Invalid(
            "relocation.jobs must be at least 1".to_string(),
        ));
    }

    if let Some(project) = &config.project {
        for (field, value) in [
            ("project.group", &project.group),
            ("project.name", &project.name),
            ("project.version", &project.version),
        ] {
            if value.is_empty() {
                return Err(ConfigError::MissingField(field.to_string()));
            }
        }
    }

    let mut seen = HashSet::new();
    for (i, lib) in config.libraries.iter().enumerate() {
        for (field, value) in [("group", &lib.group), ("name", &lib.name), ("version", &lib.version)]
        {
            if value.is_empty() {
                return Err(ConfigError::MissingField(format!("library[{i}].{field}")));
            }
        }
        let coordinate = lib.coordinate();
        if !seen.insert(coordinate.clone()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate library {coordinate}"
            )));
        }
        if lib.platform && lib.artifact.is_some() {
            return Err(ConfigError::Invalid(format!(
                "platform library {coordinate} must not declare an artifact"
            )));
        }
        for dep in &lib.dependencies {
            parse_coordinate(dep, &format!("library {coordinate} dependency"))?;
        }
    }

    for root in &relocation.roots {
        parse_coordinate(root, "relocation.roots entry")?;
    }
    Ok(())
}

pub(crate) fn parse_coordinate(text: &str, context: &str) -> Result<Module, ConfigError> {
    text.parse::<Module>()
        .map_err(|source| ConfigError::Coordinate {
            context: context.to_string(),
            source,
        })
}
