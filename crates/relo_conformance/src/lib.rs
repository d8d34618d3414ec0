//! Conformance test helpers for the relo relocation engine.
//!
//! Builds real class files with the `relo_classfile` model, packs them into
//! archives, wires them into a module graph and reads relocated output back,
//! so integration tests can assert on what actually lands in the repository.

#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use relo_archive::{ArchiveReader, ArchiveWriter, CompressionMethod, DosDateTime};
use relo_classfile::{ClassFile, ClassFileError};
use relo_common::{Module, Namespace};
use relo_graph::{Component, StaticResolver};
use relo_remap::{RelocationOptions, Relocator};

/// `ACC_PRIVATE`.
const ACC_PRIVATE: u16 = 0x0002;

/// `ACC_PUBLIC`.
const ACC_PUBLIC: u16 = 0x0001;

/// Describes a class to generate.
#[derive(Debug, Clone, Default)]
pub struct ClassSpec {
    /// Internal name, e.g. `com/acme/a/A`.
    pub name: String,
    /// Internal name of the superclass; `None` means `java/lang/Object`.
    pub super_name: Option<String>,
    /// Implemented interfaces.
    pub interfaces: Vec<String>,
    /// `(name, descriptor)` of private fields.
    pub fields: Vec<(String, String)>,
    /// `(name, descriptor)` of public methods.
    pub methods: Vec<(String, String)>,
}

impl ClassSpec {
    /// A class with no members extending `java/lang/Object`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Sets the superclass.
    pub fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(super_name.to_string());
        self
    }

    /// Adds an implemented interface.
    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    /// Adds a private field.
    pub fn field(mut self, name: &str, descriptor: &str) -> Self {
        self.fields.push((name.to_string(), descriptor.to_string()));
        self
    }

    /// Adds a public method without code.
    pub fn method(mut self, name: &str, descriptor: &str) -> Self {
        self.methods.push((name.to_string(), descriptor.to_string()));
        self
    }

    /// Serializes the class.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ClassFileError> {
        let super_name = self.super_name.as_deref().unwrap_or("java/lang/Object");
        let mut class = ClassFile::new(&self.name, Some(super_name))?;
        for interface in &self.interfaces {
            class.add_interface(interface)?;
        }
        for (name, descriptor) in &self.fields {
            class.add_field(ACC_PRIVATE, name, descriptor)?;
        }
        for (name, descriptor) in &self.methods {
            class.add_method(ACC_PUBLIC, name, descriptor)?;
        }
        Ok(class.to_bytes())
    }

    /// Entry path of the class inside an archive.
    pub fn entry_name(&self) -> String {
        format!("{}.class", self.name)
    }
}

/// Accumulates archive entries and writes them as a JAR.
#[derive(Debug, Default)]
pub struct JarBuilder {
    entries: Vec<(String, Option<Vec<u8>>)>,
}

impl JarBuilder {
    /// An empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory entry. `name` must end with `/`.
    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push((name.to_string(), None));
        self
    }

    /// Adds a file entry.
    pub fn file(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.entries.push((name.to_string(), Some(data.into())));
        self
    }

    /// Adds a generated class file.
    pub fn class(self, spec: &ClassSpec) -> Self {
        let bytes = spec
            .to_bytes()
            .unwrap_or_else(|e| panic!("cannot build class {}: {e}", spec.name));
        self.file(&spec.entry_name(), bytes)
    }

    /// Adds a source file; `path` is relative to the archive root.
    pub fn source(self, path: &str, text: &str) -> Self {
        self.file(path, text.as_bytes().to_vec())
    }

    /// Adds the standard `META-INF/MANIFEST.MF`.
    pub fn manifest(self) -> Self {
        self.dir("META-INF/")
            .file("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n\r\n".to_vec())
    }

    /// Writes the archive to `path`, creating parent directories.
    pub fn write(&self, path: &Path) {
        let mut writer = ArchiveWriter::new(Vec::new());
        for (name, data) in &self.entries {
            match data {
                None => writer
                    .add_directory(name, DosDateTime::EPOCH)
                    .unwrap_or_else(|e| panic!("cannot add {name}: {e}")),
                Some(data) => writer
                    .add_file(name, data, CompressionMethod::Deflated, DosDateTime::EPOCH)
                    .unwrap_or_else(|e| panic!("cannot add {name}: {e}")),
            }
        }
        let bytes = writer
            .finish()
            .unwrap_or_else(|e| panic!("cannot finish archive: {e}"));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("cannot create {}: {e}", parent.display()));
        }
        std::fs::write(path, bytes).unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
    }
}

/// A scratch directory holding input archives and the output repository.
pub struct Workspace {
    dir: tempfile::TempDir,
    resolver: StaticResolver,
}

impl Workspace {
    /// A fresh, empty workspace.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap_or_else(|e| panic!("cannot create temp dir: {e}")),
            resolver: StaticResolver::new(),
        }
    }

    /// Absolute path of `relative` inside the workspace.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Root of the output repository.
    pub fn repository(&self) -> PathBuf {
        self.path("repo")
    }

    /// Writes `jar` under `inputs/` and registers `module` with it as its
    /// binary artifact, depending on `dependencies`.
    pub fn library(&mut self, module: &Module, jar: &JarBuilder, dependencies: &[Module]) {
        let path = self.path(&format!("inputs/{}-{}.jar", module.name, module.version));
        jar.write(&path);
        let mut component = Component::library(module.clone(), path);
        component.dependencies = dependencies.to_vec();
        self.register(component);
    }

    /// Writes `jar` as the source archive of `module`.
    pub fn sources(&mut self, module: &Module, jar: &JarBuilder) {
        let path = self.path(&format!(
            "inputs/{}-{}-sources.jar",
            module.name, module.version
        ));
        jar.write(&path);
        let resolver = std::mem::take(&mut self.resolver);
        self.resolver = resolver.with_sources(module.clone(), path);
    }

    /// Registers an arbitrary component.
    pub fn register(&mut self, component: Component) {
        let resolver = std::mem::take(&mut self.resolver);
        self.resolver = resolver.with_component(component);
    }

    /// The resolver describing every registered component.
    pub fn resolver(&self) -> &StaticResolver {
        &self.resolver
    }

    /// A relocator writing into [`Workspace::repository`].
    pub fn relocator(&self, namespace: &str) -> Relocator {
        let namespace =
            Namespace::new(namespace).unwrap_or_else(|e| panic!("bad namespace {namespace}: {e}"));
        Relocator::new(RelocationOptions::new(namespace, self.repository()))
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry names of the archive at `path`, in archive order.
pub fn entry_names(path: &Path) -> Vec<String> {
    let reader = ArchiveReader::open(path)
        .unwrap_or_else(|e| panic!("cannot open {}: {e}", path.display()));
    reader.entries().iter().map(|e| e.name.clone()).collect()
}

/// Contents of entry `name` in the archive at `path`.
pub fn read_entry(path: &Path, name: &str) -> Vec<u8> {
    let mut reader = ArchiveReader::open(path)
        .unwrap_or_else(|e| panic!("cannot open {}: {e}", path.display()));
    reader
        .read_by_name(name)
        .unwrap_or_else(|e| panic!("cannot read {name} from {}: {e}", path.display()))
}

/// Parses entry `name` of the archive at `path` as a class file.
pub fn read_class(path: &Path, name: &str) -> ClassFile {
    ClassFile::parse(&read_entry(path, name))
        .unwrap_or_else(|e| panic!("{name} is not a valid class: {e}"))
}

/// `(name, descriptor)` of every field of `class`.
pub fn field_signatures(class: &ClassFile) -> Vec<(String, String)> {
    class
        .fields
        .iter()
        .map(|f| {
            class
                .member_signature(f)
                .unwrap_or_else(|e| panic!("bad field: {e}"))
        })
        .collect()
}

/// `(name, descriptor)` of every method of `class`.
pub fn method_signatures(class: &ClassFile) -> Vec<(String, String)> {
    class
        .methods
        .iter()
        .map(|m| {
            class
                .member_signature(m)
                .unwrap_or_else(|e| panic!("bad method: {e}"))
        })
        .collect()
}
