//! Error types for relocation.

use std::path::PathBuf;

use relo_archive::ArchiveError;
use relo_cache::CacheError;
use relo_classfile::ClassFileError;
use relo_common::Module;
use relo_graph::GraphError;

/// Errors that can occur while planning or rewriting artifacts.
#[derive(Debug, thiserror::Error)]
pub enum RemapError {
    /// An input archive could not be opened or its directory decoded.
    #[error("cannot read archive {}: {source}", path.display())]
    Archive {
        /// The archive path.
        path: PathBuf,
        /// The underlying container error.
        source: ArchiveError,
    },

    /// One entry of an archive could not be read, rewritten or written.
    #[error("entry `{entry}`: {source}")]
    Entry {
        /// The original entry path.
        entry: String,
        /// What went wrong.
        source: EntryError,
    },

    /// Relocating one module failed.
    #[error("failed to relocate {module}: {source}")]
    Module {
        /// The original module coordinate.
        module: Module,
        /// The failure.
        source: Box<RemapError>,
    },

    /// An output or its integrity record could not be written.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Graph resolution failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The worker pool could not be created.
    #[error("cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure of a single archive entry.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    /// Reading or writing the entry failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The class file could not be parsed or rewritten.
    #[error(transparent)]
    ClassFile(#[from] ClassFileError),
}

impl RemapError {
    pub(crate) fn entry(entry: &str, source: impl Into<EntryError>) -> Self {
        RemapError::Entry {
            entry: entry.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn archive(path: &std::path::Path, source: ArchiveError) -> Self {
        RemapError::Archive {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn in_module(self, module: &Module) -> Self {
        RemapError::Module {
            module: module.clone(),
            source: Box::new(self),
        }
    }
}
