//! Path rename planning.
//!
//! Every entry of every participating archive is classified once. An entry is
//! renamed when it is not under `META-INF/` and is either a directory or a
//! class-like file (`.class` / `.java`); the new path is the old one behind
//! the namespace's slash form. The resulting [`RenameMap`] is shared by the
//! binary and source rewriters so both trees move identically.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use relo_archive::{ArchiveError, ArchiveReader};
use relo_classfile::TypeMapper;
use relo_common::{ContentHash, Namespace};

use crate::error::RemapError;

/// Reserved prefix of archive metadata; never renamed.
pub const METADATA_PREFIX: &str = "META-INF/";
/// Suffix of compiled class entries.
pub const CLASS_SUFFIX: &str = ".class";
/// Suffix of source file entries.
pub const SOURCE_SUFFIX: &str = ".java";

/// Classification of one archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Under `META-INF/`.
    Metadata,
    /// A directory entry.
    Directory,
    /// A `.class` or `.java` file.
    ClassLike,
    /// Any other resource.
    Other,
}

impl EntryKind {
    /// Classifies an entry path.
    pub fn of(name: &str) -> Self {
        if name.starts_with(METADATA_PREFIX) {
            EntryKind::Metadata
        } else if name.ends_with('/') {
            EntryKind::Directory
        } else if name.ends_with(CLASS_SUFFIX) || name.ends_with(SOURCE_SUFFIX) {
            EntryKind::ClassLike
        } else {
            EntryKind::Other
        }
    }

    /// Whether entries of this kind move under the namespace.
    pub fn is_renamed(self) -> bool {
        matches!(self, EntryKind::Directory | EntryKind::ClassLike)
    }
}

/// Entry names and content fingerprint of one input archive.
#[derive(Debug, Clone)]
pub struct ArchiveScan {
    /// Where the archive was read from.
    pub path: PathBuf,
    /// Entry names in central directory order.
    pub entries: Vec<String>,
    /// Fingerprint of the archive bytes.
    pub fingerprint: ContentHash,
}

impl ArchiveScan {
    /// Reads the central directory of the archive at `path`.
    pub fn scan(path: &Path) -> Result<Self, RemapError> {
        let bytes = std::fs::read(path).map_err(|source| {
            RemapError::archive(
                path,
                ArchiveError::Open {
                    path: path.to_path_buf(),
                    source,
                },
            )
        })?;
        let fingerprint = ContentHash::from_bytes(&bytes);
        let reader =
            ArchiveReader::new(Cursor::new(bytes)).map_err(|e| RemapError::archive(path, e))?;
        let entries = reader.entries().iter().map(|e| e.name.clone()).collect();
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            fingerprint,
        })
    }
}

/// Old entry path to new entry path, for one rewrite invocation.
///
/// Entries that keep their path are absent. Iteration is in sorted order of
/// the old path, so two maps built from the same archives compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameMap {
    namespace: Namespace,
    paths: BTreeMap<String, String>,
    packages: BTreeMap<String, String>,
}

impl RenameMap {
    /// Creates an empty map for `namespace`.
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            paths: BTreeMap::new(),
            packages: BTreeMap::new(),
        }
    }

    /// Builds the map over every entry of `archives`.
    pub fn build<'a>(
        namespace: &Namespace,
        archives: impl IntoIterator<Item = &'a ArchiveScan>,
    ) -> Self {
        let mut map = Self::new(namespace.clone());
        for scan in archives {
            for entry in &scan.entries {
                map.add_entry(entry);
            }
        }
        map
    }

    /// Plans one entry path.
    pub fn add_entry(&mut self, name: &str) {
        let kind = EntryKind::of(name);
        if !kind.is_renamed() || self.paths.contains_key(name) {
            return;
        }
        let prefix = self.namespace.slashed();
        self.paths.insert(name.to_string(), format!("{prefix}/{name}"));

        let package = match kind {
            EntryKind::Directory => name.trim_end_matches('/'),
            _ => match name.rfind('/') {
                Some(slash) => &name[..slash],
                None => return,
            },
        };
        if !package.is_empty() && !self.packages.contains_key(package) {
            self.packages
                .insert(package.to_string(), format!("{prefix}/{package}"));
        }
    }

    /// The namespace entries move under.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The new path of `old`, if it moves.
    pub fn get(&self, old: &str) -> Option<&str> {
        self.paths.get(old).map(String::as_str)
    }

    /// The path `old` is written to: its new path, or itself.
    pub fn new_path<'a>(&'a self, old: &'a str) -> &'a str {
        self.get(old).unwrap_or(old)
    }

    /// Iterates `(old, new)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.paths.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of moved entries.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if nothing moves.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Dotted `(old, new)` qualified names of every relocated type, taken from
    /// source entries and from top-level class entries.
    ///
    /// Types in the default package are left out: their bare simple name is
    /// not a qualified reference.
    pub fn class_names(&self) -> BTreeSet<(String, String)> {
        let mut names = BTreeSet::new();
        for (old, new) in &self.paths {
            let stem = match old.strip_suffix(SOURCE_SUFFIX) {
                Some(stem) => stem,
                None => match old.strip_suffix(CLASS_SUFFIX) {
                    Some(stem) if !stem.contains('$') && !stem.contains('-') => stem,
                    _ => continue,
                },
            };
            if !stem.contains('/') {
                continue;
            }
            let suffix_len = old.len() - stem.len();
            let new_stem = &new[..new.len() - suffix_len];
            names.insert((stem.replace('/', "."), new_stem.replace('/', ".")));
        }
        names
    }

    /// Dotted `(old, new)` names of every package that holds a relocated entry.
    pub fn package_names(&self) -> BTreeSet<(String, String)> {
        self.packages
            .iter()
            .map(|(old, new)| (old.replace('/', "."), new.replace('/', ".")))
            .collect()
    }
}

impl TypeMapper for RenameMap {
    fn map_type(&self, internal_name: &str) -> Option<String> {
        let new = self.get(&format!("{internal_name}{CLASS_SUFFIX}"))?;
        new.strip_suffix(CLASS_SUFFIX).map(str::to_string)
    }

    fn map_package(&self, internal_name: &str) -> Option<String> {
        self.packages.get(internal_name).cloned()
    }
}
