//! Output repository layout.

use std::path::{Path, PathBuf};

use relo_common::{CoordinateScheme, Module};

/// Deterministic output paths for relocated modules.
///
/// With the flat scheme a module lands in
/// `<root>/<remapped group>/<name>/<version>/`; with the project scheme in
/// `<root>/<project group>/<project name>/<group>/<name>/<project version>/`,
/// groups written as directory paths.
#[derive(Debug, Clone)]
pub struct RepositoryLayout {
    root: PathBuf,
    scheme: CoordinateScheme,
}

impl RepositoryLayout {
    /// Creates a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, scheme: CoordinateScheme) -> Self {
        Self {
            root: root.into(),
            scheme,
        }
    }

    /// The repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The coordinate scheme in use.
    pub fn scheme(&self) -> &CoordinateScheme {
        &self.scheme
    }

    /// The relocated coordinate of `module`.
    pub fn remap(&self, module: &Module) -> Module {
        self.scheme.remap(module)
    }

    /// Directory holding every file of `module` (an original coordinate).
    pub fn module_dir(&self, module: &Module) -> PathBuf {
        let mut dir = self.root.clone();
        match &self.scheme {
            CoordinateScheme::Namespace(_) => {
                let remapped = self.remap(module);
                push_group(&mut dir, &remapped.group);
                dir.push(&remapped.name);
                dir.push(&remapped.version);
            }
            CoordinateScheme::Project {
                group,
                name,
                version,
            } => {
                push_group(&mut dir, group);
                dir.push(name);
                push_group(&mut dir, &module.group);
                dir.push(&module.name);
                dir.push(version);
            }
        }
        dir
    }

    /// `<name>-<version>.jar`.
    pub fn artifact_path(&self, module: &Module) -> PathBuf {
        let remapped = self.remap(module);
        self.module_dir(module)
            .join(format!("{}-{}.jar", remapped.name, remapped.version))
    }

    /// `<name>-<version>-sources.jar`.
    pub fn sources_path(&self, module: &Module) -> PathBuf {
        let remapped = self.remap(module);
        self.module_dir(module)
            .join(format!("{}-{}-sources.jar", remapped.name, remapped.version))
    }

    /// `ivy-<version>.xml`.
    pub fn descriptor_path(&self, module: &Module) -> PathBuf {
        let remapped = self.remap(module);
        self.module_dir(module)
            .join(format!("ivy-{}.xml", remapped.version))
    }
}

fn push_group(dir: &mut PathBuf, group: &str) {
    for segment in group.split('.') {
        dir.push(segment);
    }
}
