//! Library coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::namespace::Namespace;

/// A `(group, name, version)` coordinate identifying one library artifact.
///
/// This is the identity key for every lookup in the toolchain. Equality,
/// ordering and hashing are structural.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Module {
    /// Organisation / group id, e.g. `com.google.code.gson`.
    pub group: String,
    /// Artifact name, e.g. `gson`.
    pub name: String,
    /// Version string, e.g. `2.10.1`.
    pub version: String,
}

/// Error returned when a `group:name:version` string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid module coordinate `{0}` (expected `group:name:version`)")]
pub struct ParseModuleError(pub String);

impl Module {
    /// Creates a coordinate from its three parts.
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Prefixes the group with `namespace`, keeping name and version.
    pub fn remap(&self, namespace: &Namespace) -> Module {
        self.remap_with_version(namespace, &self.version)
    }

    /// Prefixes the group with `namespace` and replaces the version.
    pub fn remap_with_version(&self, namespace: &Namespace, version: &str) -> Module {
        Module::new(
            format!("{}.{}", namespace.dotted(), self.group),
            self.name.clone(),
            version,
        )
    }

    /// Nests the coordinate under a project: the group becomes
    /// `project_group.project_name.group` and the version is replaced.
    pub fn remap_scoped(&self, project_group: &str, project_name: &str, version: &str) -> Module {
        Module::new(
            format!("{project_group}.{project_name}.{}", self.group),
            self.name.clone(),
            version,
        )
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({self})")
    }
}

impl FromStr for Module {
    type Err = ParseModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(g), Some(n), Some(v), None) if !g.is_empty() && !n.is_empty() && !v.is_empty() => {
                Ok(Module::new(g, n, v))
            }
            _ => Err(ParseModuleError(s.to_string())),
        }
    }
}

/// How relocated coordinates are derived from original ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinateScheme {
    /// `namespace.group:name:version`.
    Namespace(Namespace),
    /// `project_group.project_name.group:name:project_version`.
    Project {
        /// Group of the consuming project.
        group: String,
        /// Name of the consuming project.
        name: String,
        /// Version of the consuming project, used for every relocated module.
        version: String,
    },
}

impl CoordinateScheme {
    /// Applies the scheme to an original coordinate.
    pub fn remap(&self, module: &Module) -> Module {
        match self {
            CoordinateScheme::Namespace(ns) => module.remap(ns),
            CoordinateScheme::Project {
                group,
                name,
                version,
            } => module.remap_scoped(group, name, version),
        }
    }
}
