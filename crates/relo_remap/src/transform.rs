//! Single-archive relocation outside a module graph.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use relo_cache::IntegrityCache;
use relo_common::{ContentHasher, Namespace, TOOL_VERSION};

use crate::engine::{relocate_archive, Outcome};
use crate::error::RemapError;
use crate::pipeline::ArtifactKind;
use crate::plan::{ArchiveScan, RenameMap};

/// One primary archive relocated against its dependency archives.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    /// Namespace to relocate under.
    pub namespace: Namespace,
    /// Whether `input` holds classes or sources.
    pub kind: ArtifactKind,
    /// The archive to rewrite.
    pub input: PathBuf,
    /// Archives whose entries also take part in the rename map.
    pub dependencies: Vec<PathBuf>,
    /// Where the relocated archive is written.
    pub output: PathBuf,
}

/// Scans `archives` in parallel and plans their renames.
pub fn plan_archives(namespace: &Namespace, archives: &[PathBuf]) -> Result<RenameMap, RemapError> {
    let scans = scan_all(archives)?;
    Ok(RenameMap::build(namespace, &scans))
}

/// Relocates `request.input` into `request.output`, skipping the work when
/// the output is already current.
pub fn transform_artifact(
    request: &TransformRequest,
    cache: &IntegrityCache,
) -> Result<Outcome, RemapError> {
    let mut archives = Vec::with_capacity(request.dependencies.len() + 1);
    archives.push(request.input.clone());
    archives.extend(request.dependencies.iter().cloned());
    let scans = scan_all(&archives)?;
    let map = RenameMap::build(&request.namespace, &scans);

    let mut hasher = ContentHasher::new();
    hasher
        .str_field(TOOL_VERSION)
        .str_field(request.namespace.dotted());
    for scan in &scans {
        hasher.hash_field(&scan.fingerprint);
    }
    relocate_archive(
        cache,
        request.kind,
        &request.input,
        &request.output,
        &map,
        &hasher.finish(),
    )
}

fn scan_all(archives: &[PathBuf]) -> Result<Vec<ArchiveScan>, RemapError> {
    archives
        .par_iter()
        .map(|path| ArchiveScan::scan(Path::new(path)))
        .collect()
}
