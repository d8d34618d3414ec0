//! The relocation engine.
//!
//! [`Relocator::relocate`] scans every input archive of a resolved
//! [`ModuleGraph`] in parallel, then relocates each module independently: its
//! binary archive, its source archive when present, and its Ivy descriptor.
//! The scan is a barrier; after it all shared state is read-only and every
//! module writes to its own directory.

use std::collections::HashMap;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use relo_archive::{ArchiveReader, ArchiveWriter};
use relo_cache::{CacheError, HashAlgorithm, IntegrityCache};
use relo_common::{
    ContentHash, ContentHasher, CoordinateScheme, Module, Namespace, TOOL_VERSION,
};
use relo_graph::{GraphNode, ModuleGraph, NodeId};
use serde::Serialize;

use crate::descriptor::ivy_descriptor;
use crate::error::RemapError;
use crate::pipeline::{rebuild, ArtifactKind, Rewriter};
use crate::plan::{ArchiveScan, RenameMap};
use crate::repository::RepositoryLayout;

/// Settings for one relocation run.
#[derive(Debug, Clone)]
pub struct RelocationOptions {
    /// Namespace every relocated class moves under.
    pub namespace: Namespace,
    /// How relocated coordinates are derived.
    pub scheme: CoordinateScheme,
    /// Root of the output repository.
    pub repository: PathBuf,
    /// Relocate source archives when the graph provides them.
    pub include_sources: bool,
    /// Sidecar digest algorithm.
    pub hash: HashAlgorithm,
    /// Worker threads; `None` uses the global rayon pool.
    pub jobs: Option<usize>,
}

impl RelocationOptions {
    /// Flat coordinates under `namespace`, sources included, default digest.
    pub fn new(namespace: Namespace, repository: impl Into<PathBuf>) -> Self {
        Self {
            scheme: CoordinateScheme::Namespace(namespace.clone()),
            namespace,
            repository: repository.into(),
            include_sources: true,
            hash: HashAlgorithm::default(),
            jobs: None,
        }
    }
}

/// What happened to one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// The file was (re)generated.
    Written,
    /// The existing file was valid for the current inputs; nothing was written.
    UpToDate,
    /// Nothing to generate.
    Skipped,
}

/// Kind of a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Relocated binary archive.
    Binary,
    /// Relocated source archive.
    Sources,
    /// Ivy descriptor.
    Descriptor,
}

/// One generated (or skipped) file.
#[derive(Debug, Clone, Serialize)]
pub struct OutputReport {
    /// What the file is.
    pub kind: OutputKind,
    /// Where it lives; absent when skipped.
    pub path: Option<PathBuf>,
    /// What happened.
    pub outcome: Outcome,
}

/// Result for one module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    /// The original coordinate.
    pub module: Module,
    /// The relocated coordinate.
    pub remapped: Module,
    /// Relocated coordinates of the direct dependencies.
    pub dependencies: Vec<Module>,
    /// Generated files.
    pub outputs: Vec<OutputReport>,
}

impl ModuleReport {
    /// The outcome for `kind`, if reported.
    pub fn outcome(&self, kind: OutputKind) -> Option<Outcome> {
        self.outputs.iter().find(|o| o.kind == kind).map(|o| o.outcome)
    }
}

/// Result of a whole relocation run, in graph post-order.
#[derive(Debug, Clone, Serialize)]
pub struct RelocationReport {
    /// The namespace used.
    pub namespace: Namespace,
    /// One entry per graph node.
    pub modules: Vec<ModuleReport>,
    /// Wall-clock duration of the run.
    pub elapsed_ms: u64,
}

impl RelocationReport {
    /// Number of outputs with the given outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.modules
            .iter()
            .flat_map(|m| &m.outputs)
            .filter(|o| o.outcome == outcome)
            .count()
    }

    /// The report for an original coordinate.
    pub fn module(&self, module: &Module) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| &m.module == module)
    }
}

/// Relocates resolved module graphs into an output repository.
#[derive(Debug, Clone)]
pub struct Relocator {
    options: RelocationOptions,
    layout: RepositoryLayout,
    cache: IntegrityCache,
}

impl Relocator {
    /// Creates a relocator.
    pub fn new(options: RelocationOptions) -> Self {
        let layout = RepositoryLayout::new(options.repository.clone(), options.scheme.clone());
        let cache = IntegrityCache::new(options.hash);
        Self {
            options,
            layout,
            cache,
        }
    }

    /// The output layout.
    pub fn layout(&self) -> &RepositoryLayout {
        &self.layout
    }

    /// Relocates every module of `graph`.
    ///
    /// A failure in any module aborts the run with that module's coordinate
    /// attached. Outputs already committed by other modules stay valid.
    pub fn relocate(&self, graph: &ModuleGraph) -> Result<RelocationReport, RemapError> {
        match self.options.jobs {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?;
                pool.install(|| self.run(graph))
            }
            None => self.run(graph),
        }
    }

    fn run(&self, graph: &ModuleGraph) -> Result<RelocationReport, RemapError> {
        let start = Instant::now();
        let scans = self.scan_inputs(graph)?;

        let nodes: Vec<(NodeId, &GraphNode)> = graph.nodes().collect();
        let modules = nodes
            .par_iter()
            .map(|&(id, node)| {
                self.relocate_module(graph, id, node, &scans)
                    .map_err(|e| e.in_module(&node.module))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let report = RelocationReport {
            namespace: self.options.namespace.clone(),
            modules,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        tracing::debug!(
            modules = report.modules.len(),
            written = report.count(Outcome::Written),
            up_to_date = report.count(Outcome::UpToDate),
            elapsed_ms = report.elapsed_ms,
            "Relocated {} artifacts in {} ms",
            report.count(Outcome::Written),
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Reads the directory of every archive that can contribute to a rename
    /// map. Must complete before any module is rewritten.
    fn scan_inputs(
        &self,
        graph: &ModuleGraph,
    ) -> Result<HashMap<PathBuf, ArchiveScan>, RemapError> {
        let start = Instant::now();
        let mut paths: Vec<&Path> = Vec::new();
        for (_, node) in graph.nodes().filter(|(_, n)| !n.already_remapped) {
            paths.push(&node.artifact);
            if self.options.include_sources {
                if let Some(sources) = &node.sources {
                    paths.push(sources);
                }
            }
        }
        paths.sort();
        paths.dedup();

        let scans = paths
            .par_iter()
            .map(|path| {
                ArchiveScan::scan(path).map(|scan| (path.to_path_buf(), scan))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;
        tracing::debug!(
            archives = scans.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "scanned input archives"
        );
        Ok(scans)
    }

    fn coordinate_of(&self, node: &GraphNode) -> Module {
        if node.already_remapped {
            node.module.clone()
        } else {
            self.layout.remap(&node.module)
        }
    }

    fn relocate_module(
        &self,
        graph: &ModuleGraph,
        id: NodeId,
        node: &GraphNode,
        scans: &HashMap<PathBuf, ArchiveScan>,
    ) -> Result<ModuleReport, RemapError> {
        let remapped = self.coordinate_of(node);
        let dependencies: Vec<Module> = node
            .dependencies
            .iter()
            .map(|&dep| self.coordinate_of(graph.node(dep)))
            .collect();

        if node.already_remapped {
            tracing::debug!(module = %node.module, "already relocated; passing through");
            return Ok(ModuleReport {
                module: node.module.clone(),
                remapped,
                dependencies,
                outputs: vec![OutputReport {
                    kind: OutputKind::Binary,
                    path: None,
                    outcome: Outcome::Skipped,
                }],
            });
        }

        // The module's own archives first, then its closure in visit order.
        let mut contributing: Vec<&ArchiveScan> = Vec::new();
        for member in std::iter::once(id).chain(graph.transitive_dependencies(id)) {
            let member = graph.node(member);
            if member.already_remapped {
                continue;
            }
            contributing.extend(scans.get(&member.artifact));
            if self.options.include_sources {
                if let Some(sources) = &member.sources {
                    contributing.extend(scans.get(sources));
                }
            }
        }
        let map = RenameMap::build(&self.options.namespace, contributing.iter().copied());
        tracing::debug!(module = %node.module, renamed = map.len(), "planned renames");

        let inputs = input_fingerprint(&self.options.namespace, &remapped, &contributing);
        let mut outputs = Vec::with_capacity(3);

        let binary = self.layout.artifact_path(&node.module);
        let outcome = relocate_archive(
            &self.cache,
            ArtifactKind::Binary,
            &node.artifact,
            &binary,
            &map,
            &inputs,
        )?;
        outputs.push(OutputReport {
            kind: OutputKind::Binary,
            path: Some(binary),
            outcome,
        });

        let sources = match (&node.sources, self.options.include_sources) {
            (Some(input), true) => {
                let target = self.layout.sources_path(&node.module);
                let outcome = relocate_archive(
                    &self.cache,
                    ArtifactKind::Sources,
                    input,
                    &target,
                    &map,
                    &inputs,
                )?;
                OutputReport {
                    kind: OutputKind::Sources,
                    path: Some(target),
                    outcome,
                }
            }
            (None, true) => {
                tracing::warn!(
                    module = %node.module,
                    "no source artifact; skipping source relocation"
                );
                skipped(OutputKind::Sources)
            }
            (_, false) => skipped(OutputKind::Sources),
        };
        outputs.push(sources);

        let descriptor = self.layout.descriptor_path(&node.module);
        let xml = ivy_descriptor(&remapped, &dependencies);
        let fingerprint = ContentHasher::new()
            .str_field(TOOL_VERSION)
            .str_field("descriptor")
            .str_field(&xml)
            .finish();
        let outcome = if self.cache.check(&descriptor, &fingerprint).is_up_to_date() {
            Outcome::UpToDate
        } else {
            self.cache.write(&descriptor, xml.as_bytes(), &fingerprint)?;
            Outcome::Written
        };
        outputs.push(OutputReport {
            kind: OutputKind::Descriptor,
            path: Some(descriptor),
            outcome,
        });

        Ok(ModuleReport {
            module: node.module.clone(),
            remapped,
            dependencies,
            outputs,
        })
    }
}

fn skipped(kind: OutputKind) -> OutputReport {
    OutputReport {
        kind,
        path: None,
        outcome: Outcome::Skipped,
    }
}

/// Fingerprint of everything that determines a module's relocated archives.
pub(crate) fn input_fingerprint(
    namespace: &Namespace,
    remapped: &Module,
    contributing: &[&ArchiveScan],
) -> ContentHash {
    let mut hasher = ContentHasher::new();
    hasher
        .str_field(TOOL_VERSION)
        .str_field(namespace.dotted())
        .str_field(&remapped.to_string());
    for scan in contributing {
        hasher.hash_field(&scan.fingerprint);
    }
    hasher.finish()
}

/// Rebuilds `input` into `target` unless the integrity cache says the target
/// is already current for `inputs`.
pub(crate) fn relocate_archive(
    cache: &IntegrityCache,
    kind: ArtifactKind,
    input: &Path,
    target: &Path,
    map: &RenameMap,
    inputs: &ContentHash,
) -> Result<Outcome, RemapError> {
    let fingerprint = ContentHasher::new()
        .hash_field(inputs)
        .str_field(kind.as_str())
        .finish();
    if cache.check(target, &fingerprint).is_up_to_date() {
        tracing::debug!(path = %target.display(), "up to date");
        return Ok(Outcome::UpToDate);
    }

    let start = Instant::now();
    let mut reader = ArchiveReader::open(input).map_err(|e| RemapError::archive(input, e))?;
    let staged = cache.stage(target)?;
    let mut writer = ArchiveWriter::new(BufWriter::new(staged));
    let rewriter = Rewriter::new(kind, map);
    let stats = rebuild(&mut reader, &mut writer, map, &rewriter)?;
    let buffered = writer
        .finish()
        .map_err(|e| RemapError::archive(target, e))?;
    let staged = buffered.into_inner().map_err(|e| CacheError::Io {
        path: target.to_path_buf(),
        source: e.into_error(),
    })?;
    staged.commit(&fingerprint)?;

    tracing::debug!(
        path = %target.display(),
        kind = kind.as_str(),
        entries = stats.entries,
        renamed = stats.renamed,
        rewritten = stats.rewritten,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "relocated archive"
    );
    Ok(Outcome::Written)
}
