//! Artifact relocation engine.
//!
//! Moves the classes of resolved libraries under a private namespace:
//! [`RenameMap`] plans which archive entries move, [`Rewriter`] updates the
//! references inside class files and source files, [`rebuild`] streams an
//! archive through both, and [`Relocator`] drives a whole module graph into
//! an output repository with integrity-checked, incremental writes and Ivy
//! descriptors.

#![warn(missing_docs)]

pub mod descriptor;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod repository;
pub mod source;
pub mod transform;

pub use descriptor::ivy_descriptor;
pub use engine::{
    ModuleReport, Outcome, OutputKind, OutputReport, RelocationOptions, RelocationReport,
    Relocator,
};
pub use error::{EntryError, RemapError};
pub use pipeline::{rebuild, ArtifactKind, RebuildStats, Rewriter};
pub use plan::{ArchiveScan, EntryKind, RenameMap};
pub use repository::RepositoryLayout;
pub use source::SourceRemapper;
pub use transform::{plan_archives, transform_artifact, TransformRequest};
