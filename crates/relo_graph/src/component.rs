//! The resolution collaborator interface.
//!
//! The host build tool owns dependency resolution. It describes the result as
//! a [`ComponentGraph`]: a set of components keyed by coordinate, each with an
//! optional artifact file and its outgoing dependency edges, plus the
//! first-level coordinates that were requested.

use std::collections::HashMap;
use std::path::PathBuf;

use relo_common::Module;

use crate::error::GraphError;

/// One resolved component as reported by the host.
#[derive(Debug, Clone)]
pub struct Component {
    /// The component's coordinate.
    pub module: Module,
    /// The primary (binary) artifact, absent for platform/BOM-only nodes.
    pub artifact: Option<PathBuf>,
    /// Whether the component is a platform/BOM that carries no artifact.
    pub platform: bool,
    /// Whether the artifact is already relocated and must be passed through.
    pub already_remapped: bool,
    /// Direct dependencies, by coordinate.
    pub dependencies: Vec<Module>,
}

impl Component {
    /// Creates a regular library component with an artifact and no edges.
    pub fn library(module: Module, artifact: impl Into<PathBuf>) -> Self {
        Self {
            module,
            artifact: Some(artifact.into()),
            platform: false,
            already_remapped: false,
            dependencies: Vec::new(),
        }
    }

    /// Creates a platform component without an artifact.
    pub fn platform(module: Module) -> Self {
        Self {
            module,
            artifact: None,
            platform: true,
            already_remapped: false,
            dependencies: Vec::new(),
        }
    }

    /// Adds a dependency edge (builder style).
    pub fn depends_on(mut self, module: Module) -> Self {
        self.dependencies.push(module);
        self
    }
}

/// A resolved component graph with a synthetic root.
///
/// The root itself is not a component; `roots` lists its direct children.
#[derive(Debug, Clone, Default)]
pub struct ComponentGraph {
    /// First-level coordinates (children of the synthetic root).
    pub roots: Vec<Module>,
    components: HashMap<Module, Component>,
}

impl ComponentGraph {
    /// Creates an empty graph with the given first-level coordinates.
    pub fn new(roots: Vec<Module>) -> Self {
        Self {
            roots,
            components: HashMap::new(),
        }
    }

    /// Adds or replaces a component.
    pub fn insert(&mut self, component: Component) {
        self.components.insert(component.module.clone(), component);
    }

    /// Looks up a component by coordinate.
    pub fn get(&self, module: &Module) -> Option<&Component> {
        self.components.get(module)
    }

    /// Returns the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if no components are known.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Capability the host provides to resolve artifacts.
pub trait ArtifactResolver {
    /// Resolves `requested` (possibly transitively) into a component graph
    /// whose roots are the requested coordinates.
    fn resolve_components(&self, requested: &[Module]) -> Result<ComponentGraph, GraphError>;

    /// Looks up source archives for exactly the given modules. This lookup is
    /// not transitive; modules without sources are simply absent from the map.
    fn resolve_sources(&self, modules: &[Module]) -> HashMap<Module, PathBuf>;
}

/// A resolver over a fixed, fully described component set.
///
/// Used when the host has already resolved everything up front, for example
/// from a `relocate.toml` library list.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    components: Vec<Component>,
    sources: HashMap<Module, PathBuf>,
}

impl StaticResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component.
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Registers a source archive for a module.
    pub fn with_sources(mut self, module: Module, path: impl Into<PathBuf>) -> Self {
        self.sources.insert(module, path.into());
        self
    }

    /// Every registered coordinate, in registration order.
    pub fn modules(&self) -> Vec<Module> {
        self.components.iter().map(|c| c.module.clone()).collect()
    }
}

impl ArtifactResolver for StaticResolver {
    fn resolve_components(&self, requested: &[Module]) -> Result<ComponentGraph, GraphError> {
        let mut graph = ComponentGraph::new(requested.to_vec());
        for component in &self.components {
            graph.insert(component.clone());
        }
        Ok(graph)
    }

    fn resolve_sources(&self, modules: &[Module]) -> HashMap<Module, PathBuf> {
        modules
            .iter()
            .filter_map(|m| self.sources.get(m).map(|p| (m.clone(), p.clone())))
            .collect()
    }
}
