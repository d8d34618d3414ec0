//! Module dependency graph model and resolver.
//!
//! The host build supplies a [`ComponentGraph`] through an
//! [`ArtifactResolver`]; [`resolve_graph`] turns it into a cycle-checked,
//! de-duplicated [`ModuleGraph`] whose nodes live in an [`Arena`] and refer to
//! each other by [`NodeId`] rather than by shared pointers.

#![warn(missing_docs)]

pub mod arena;
pub mod component;
pub mod error;
pub mod graph;
pub mod ids;
pub mod resolve;

pub use arena::Arena;
pub use component::{ArtifactResolver, Component, ComponentGraph, StaticResolver};
pub use error::GraphError;
pub use graph::{GraphNode, ModuleGraph};
pub use ids::NodeId;
pub use resolve::{build_graph, resolve_graph};
