//! Archive rebuild pipeline.
//!
//! An input archive is streamed entry by entry into a new archive: every entry
//! is renamed through the [`RenameMap`] and its bytes pass through the one
//! [`Rewriter`] chosen for the whole archive. Timestamps, compression methods
//! and attributes are carried over, so an archive without class-like entries
//! is rebuilt entry for entry.

use std::io::{Read, Seek, Write};

use relo_archive::{ArchiveReader, ArchiveWriter, CompressionMethod};
use serde::{Deserialize, Serialize};

use crate::error::RemapError;
use crate::plan::{RenameMap, CLASS_SUFFIX, SOURCE_SUFFIX};
use crate::source::SourceRemapper;

/// Which artifact an archive holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Compiled classes.
    Binary,
    /// Source files.
    Sources,
}

impl ArtifactKind {
    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Binary => "binary",
            ArtifactKind::Sources => "sources",
        }
    }
}

/// Per-archive content transform.
#[derive(Debug)]
pub enum Rewriter<'a> {
    /// Rewrites type references in `.class` entries.
    Binary(&'a RenameMap),
    /// Rewrites qualified names in `.java` entries.
    Source(SourceRemapper),
}

impl<'a> Rewriter<'a> {
    /// Creates the rewriter for `kind` over `map`.
    pub fn new(kind: ArtifactKind, map: &'a RenameMap) -> Self {
        match kind {
            ArtifactKind::Binary => Rewriter::Binary(map),
            ArtifactKind::Sources => Rewriter::Source(SourceRemapper::new(map)),
        }
    }

    /// The artifact kind this rewriter handles.
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Rewriter::Binary(_) => ArtifactKind::Binary,
            Rewriter::Source(_) => ArtifactKind::Sources,
        }
    }

    /// Transforms the content of the entry at `path` (its original path).
    /// Entries the rewriter does not understand are returned unchanged.
    pub fn transform(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>, RemapError> {
        match self {
            Rewriter::Binary(map) if path.ends_with(CLASS_SUFFIX) => {
                relo_classfile::remap_class(&data, *map).map_err(|e| RemapError::entry(path, e))
            }
            Rewriter::Source(remapper) if path.ends_with(SOURCE_SUFFIX) => {
                Ok(remapper.rewrite(path, data))
            }
            _ => Ok(data),
        }
    }
}

/// Streams every entry of `reader` through `rewriter` into `writer`.
pub fn rebuild<R, W>(
    reader: &mut ArchiveReader<R>,
    writer: &mut ArchiveWriter<W>,
    map: &RenameMap,
    rewriter: &Rewriter<'_>,
) -> Result<RebuildStats, RemapError>
where
    R: Read + Seek,
    W: Write,
{
    let mut stats = RebuildStats::default();
    for index in 0..reader.len() {
        let entry = reader.entries()[index].clone();
        let target = map.new_path(&entry.name).to_string();
        if target != entry.name {
            stats.renamed += 1;
        }

        if entry.is_dir() {
            writer
                .add_entry(
                    target,
                    &[],
                    CompressionMethod::Stored,
                    entry.modified,
                    entry.external_attributes,
                )
                .map_err(|e| RemapError::entry(&entry.name, e))?;
            continue;
        }

        let data = reader
            .read(index)
            .map_err(|e| RemapError::entry(&entry.name, e))?;
        let original_len = data.len();
        let original_crc = entry.crc32;
        let out = rewriter.transform(&entry.name, data)?;
        if out.len() != original_len || crc32(&out) != original_crc {
            stats.rewritten += 1;
        }
        writer
            .add_entry(
                target,
                &out,
                entry.method,
                entry.modified,
                entry.external_attributes,
            )
            .map_err(|e| RemapError::entry(&entry.name, e))?;
    }
    stats.entries = reader.len();
    Ok(stats)
}

/// Counters from one [`rebuild`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Entries copied.
    pub entries: usize,
    /// Entries written under a new path.
    pub renamed: usize,
    /// Entries whose content changed.
    pub rewritten: usize,
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}
