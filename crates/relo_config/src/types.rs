//! Configuration types deserialized from `relocate.toml`.

use relo_cache::HashAlgorithm;
use serde::Deserialize;

/// The top-level relocation manifest parsed from `relocate.toml`.
#[derive(Debug, Deserialize)]
pub struct RelocationConfig {
    /// Namespace, output location and switches.
    pub relocation: RelocationSection,
    /// Optional project scope for nested coordinates.
    #[serde(default)]
    pub project: Option<ProjectSection>,
    /// The libraries to relocate, with their dependency edges.
    #[serde(default, rename = "library")]
    pub libraries: Vec<LibrarySpec>,
}

/// The `[relocation]` table.
#[derive(Debug, Deserialize)]
pub struct RelocationSection {
    /// Dotted namespace prefix, e.g. `eu.example.libs`.
    pub namespace: String,
    /// Output repository root, relative to the manifest.
    #[serde(default = "default_output")]
    pub output: String,
    /// Whether source archives are relocated when available.
    #[serde(default = "default_true")]
    pub sources: bool,
    /// Digest used for integrity sidecars.
    #[serde(default)]
    pub hash: HashAlgorithm,
    /// Worker thread count; `None` uses the default pool.
    #[serde(default)]
    pub jobs: Option<usize>,
    /// First-level coordinates (`group:name:version`). Empty means every library.
    #[serde(default)]
    pub roots: Vec<String>,
}

/// The `[project]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Group of the consuming project.
    pub group: String,
    /// Name of the consuming project.
    pub name: String,
    /// Version of the consuming project.
    pub version: String,
}

/// One `[[library]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct LibrarySpec {
    /// Group id.
    pub group: String,
    /// Artifact name.
    pub name: String,
    /// Version.
    pub version: String,
    /// Binary archive path, relative to the manifest. Absent for platform nodes.
    #[serde(default)]
    pub artifact: Option<String>,
    /// Source archive path, relative to the manifest.
    #[serde(default)]
    pub sources: Option<String>,
    /// Platform/BOM node without an artifact.
    #[serde(default)]
    pub platform: bool,
    /// Already relocated; copied through untouched.
    #[serde(default)]
    pub remapped: bool,
    /// Direct dependencies as `group:name:version`.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl LibrarySpec {
    /// The `group:name:version` form of this library.
    pub fn coordinate(&self) -> String {
        format!("{}:{}:{}", self.group, self.name, self.version)
    }
}

fn default_output() -> String {
    "build/relocated".to_string()
}

fn default_true() -> bool {
    true
}
