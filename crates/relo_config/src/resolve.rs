//! Resolution of a validated manifest against its directory.

use std::path::{Path, PathBuf};

use relo_cache::HashAlgorithm;
use relo_common::{CoordinateScheme, Module, Namespace};

use crate::error::ConfigError;
use crate::loader::parse_coordinate;
use crate::types::RelocationConfig;

/// One library with parsed coordinates and absolute paths.
#[derive(Debug, Clone)]
pub struct ResolvedLibrary {
    /// The library coordinate.
    pub module: Module,
    /// Binary archive, if any.
    pub artifact: Option<PathBuf>,
    /// Source archive, if any.
    pub sources: Option<PathBuf>,
    /// Platform/BOM node.
    pub platform: bool,
    /// Already relocated.
    pub remapped: bool,
    /// Direct dependencies.
    pub dependencies: Vec<Module>,
}

/// A manifest ready to drive the relocation engine.
#[derive(Debug, Clone)]
pub struct ResolvedRelocation {
    /// The namespace prefix.
    pub namespace: Namespace,
    /// How relocated coordinates are derived.
    pub scheme: CoordinateScheme,
    /// Absolute output repository root.
    pub output: PathBuf,
    /// Whether source archives are relocated.
    pub include_sources: bool,
    /// Sidecar digest algorithm.
    pub hash: HashAlgorithm,
    /// Worker thread count.
    pub jobs: Option<usize>,
    /// First-level coordinates. Defaults to every library in manifest order.
    pub roots: Vec<Module>,
    /// Every library, in manifest order.
    pub libraries: Vec<ResolvedLibrary>,
}

/// Resolves a manifest whose relative paths are anchored at `base_dir`.
///
/// With a `[project]` table the coordinates are nested under the project;
/// otherwise they are prefixed with the namespace.
pub fn resolve_relocation(
    config: &RelocationConfig,
    base_dir: &Path,
) -> Result<ResolvedRelocation, ConfigError> {
    let relocation = &config.relocation;
    let namespace = Namespace::new(&relocation.namespace)?;

    let scheme = match &config.project {
        Some(project) => CoordinateScheme::Project {
            group: project.group.clone(),
            name: project.name.clone(),
            version: project.version.clone(),
        },
        None => CoordinateScheme::Namespace(namespace.clone()),
    };

    let mut libraries = Vec::with_capacity(config.libraries.len());
    for lib in &config.libraries {
        let dependencies = lib
            .dependencies
            .iter()
            .map(|d| parse_coordinate(d, &format!("library {} dependency", lib.coordinate())))
            .collect::<Result<Vec<_>, _>>()?;
        libraries.push(ResolvedLibrary {
            module: Module::new(&lib.group, &lib.name, &lib.version),
            artifact: lib.artifact.as_deref().map(|p| base_dir.join(p)),
            sources: lib.sources.as_deref().map(|p| base_dir.join(p)),
            platform: lib.platform,
            remapped: lib.remapped,
            dependencies,
        });
    }

    let roots = if relocation.roots.is_empty() {
        libraries.iter().map(|l| l.module.clone()).collect()
    } else {
        relocation
            .roots
            .iter()
            .map(|r| parse_coordinate(r, "relocation.roots entry"))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(ResolvedRelocation {
        namespace,
        scheme,
        output: base_dir.join(&relocation.output),
        include_sources: relocation.sources,
        hash: relocation.hash,
        jobs: relocation.jobs,
        roots,
        libraries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    const MANIFEST: &str = r#"
[relocation]
namespace = "ns"
output = "repo"

[[library]]
group = "com.acme"
name = "app"
version = "1.0"
artifact = "libs/app.jar"
sources = "libs/app-sources.jar"
dependencies = ["com.acme:util:2.0"]

[[library]]
group = "com.acme"
name = "util"
version = "2.0"
artifact = "libs/util.jar"
"#;

    #[test]
    fn paths_are_anchored_at_base_dir() {
        let config = load_config_from_str(MANIFEST).unwrap();
        let resolved = resolve_relocation(&config, Path::new("/work")).unwrap();
        assert_eq!(resolved.output, PathBuf::from("/work/repo"));
        let app = &resolved.libraries[0];
        assert_eq!(app.artifact.as_deref(), Some(Path::new("/work/libs/app.jar")));
        assert_eq!(
            app.sources.as_deref(),
            Some(Path::new("/work/libs/app-sources.jar"))
        );
        assert_eq!(app.dependencies, vec![Module::new("com.acme", "util", "2.0")]);
    }

    #[test]
    fn roots_default_to_every_library() {
        let config = load_config_from_str(MANIFEST).unwrap();
        let resolved = resolve_relocation(&config, Path::new(".")).unwrap();
        assert_eq!(resolved.roots.len(), 2);
        assert!(matches!(resolved.scheme, CoordinateScheme::Namespace(_)));
    }

    #[test]
    fn project_table_selects_nested_scheme() {
        let manifest = format!(
            "{MANIFEST}\n[project]\ngroup = \"eu.example\"\nname = \"app\"\nversion = \"3.1\"\n"
        );
        let config = load_config_from_str(&manifest).unwrap();
        let resolved = resolve_relocation(&config, Path::new(".")).unwrap();
        let remapped = resolved.scheme.remap(&Module::new("com.acme", "util", "2.0"));
        assert_eq!(remapped, Module::new("eu.example.app.com.acme", "util", "3.1"));
    }
}
