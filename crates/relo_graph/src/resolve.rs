//! Depth-first materialization of a [`ComponentGraph`] into a [`ModuleGraph`].

use std::collections::HashSet;

use relo_common::Module;

use crate::component::{ArtifactResolver, ComponentGraph};
use crate::error::GraphError;
use crate::graph::{GraphNode, ModuleGraph};
use crate::ids::NodeId;

/// Resolves `requested` through `resolver` and builds the de-duplicated,
/// cycle-checked module graph.
///
/// Source archives are looked up afterwards in a second, non-transitive pass
/// over every materialized module; modules without sources keep `None`.
pub fn resolve_graph(
    resolver: &dyn ArtifactResolver,
    requested: &[Module],
) -> Result<ModuleGraph, GraphError> {
    let components = resolver.resolve_components(requested)?;
    let mut graph = build_graph(&components)?;

    let modules = graph.modules();
    let mut sources = resolver.resolve_sources(&modules);
    let ids: Vec<NodeId> = graph.nodes().map(|(id, _)| id).collect();
    for id in ids {
        let Some(node) = graph.node_mut(id) else {
            continue;
        };
        node.sources = sources.remove(&node.module);
        if node.sources.is_none() {
            tracing::debug!(module = %node.module, "no source archive available");
        }
    }

    tracing::debug!(
        modules = graph.len(),
        roots = graph.roots().len(),
        "resolved module graph"
    );
    Ok(graph)
}

/// Builds the module graph from an already resolved component graph.
pub fn build_graph(components: &ComponentGraph) -> Result<ModuleGraph, GraphError> {
    let mut walker = Walker {
        components,
        graph: ModuleGraph::new(),
        visiting: Vec::new(),
    };
    for root in &components.roots {
        if let Some(id) = walker.visit(root, None)? {
            walker.graph.add_root(id);
        }
    }
    Ok(walker.graph)
}

struct Walker<'a> {
    components: &'a ComponentGraph,
    graph: ModuleGraph,
    /// Modules whose visit is still in progress, outermost first.
    visiting: Vec<Module>,
}

impl Walker<'_> {
    /// Materializes `module`, returning `None` for platform nodes.
    fn visit(
        &mut self,
        module: &Module,
        parent: Option<&Module>,
    ) -> Result<Option<NodeId>, GraphError> {
        if let Some(id) = self.graph.lookup(module) {
            return Ok(Some(id));
        }

        if let Some(pos) = self.visiting.iter().position(|m| m == module) {
            let mut cycle = self.visiting[pos..].to_vec();
            cycle.push(module.clone());
            return Err(GraphError::CircularDependency { cycle });
        }

        let component =
            self.components
                .get(module)
                .ok_or_else(|| GraphError::UnknownComponent {
                    module: module.clone(),
                    required_by: parent.cloned(),
                })?;

        let artifact = match &component.artifact {
            Some(path) => path.clone(),
            None if component.platform => {
                tracing::debug!(module = %module, "skipping platform component");
                return Ok(None);
            }
            None => {
                return Err(GraphError::MissingArtifact {
                    module: module.clone(),
                })
            }
        };

        self.visiting.push(module.clone());
        let mut dependencies = Vec::with_capacity(component.dependencies.len());
        let mut seen = HashSet::new();
        for dep in &component.dependencies {
            if let Some(id) = self.visit(dep, Some(module))? {
                if seen.insert(id) {
                    dependencies.push(id);
                }
            }
        }
        self.visiting.pop();

        let id = self.graph.insert(GraphNode {
            module: module.clone(),
            artifact,
            sources: None,
            already_remapped: component.already_remapped,
            dependencies,
        });
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, StaticResolver};

    fn m(name: &str) -> Module {
        Module::new("org.example", name, "1.0")
    }

    fn lib(name: &str) -> Component {
        Component::library(m(name), format!("{name}.jar"))
    }

    #[test]
    fn diamond_is_deduplicated() {
        let resolver = StaticResolver::new()
            .with_component(lib("top").depends_on(m("left")).depends_on(m("right")))
            .with_component(lib("left").depends_on(m("base")))
            .with_component(lib("right").depends_on(m("base")))
            .with_component(lib("base"));

        let graph = resolve_graph(&resolver, &[m("top")]).unwrap();
        assert_eq!(graph.len(), 4);

        let base = graph.lookup(&m("base")).unwrap();
        let left = graph.lookup(&m("left")).unwrap();
        let right = graph.lookup(&m("right")).unwrap();
        assert_eq!(graph.node(left).dependencies, vec![base]);
        assert_eq!(graph.node(right).dependencies, vec![base]);
        assert_eq!(graph.roots(), &[graph.lookup(&m("top")).unwrap()]);
    }

    #[test]
    fn dependencies_precede_dependents() {
        let resolver = StaticResolver::new()
            .with_component(lib("a").depends_on(m("b")))
            .with_component(lib("b"));
        let graph = resolve_graph(&resolver, &[m("a")]).unwrap();
        let a = graph.lookup(&m("a")).unwrap();
        let b = graph.lookup(&m("b")).unwrap();
        assert!(b < a);
    }

    #[test]
    fn cycle_is_reported_with_path() {
        let resolver = StaticResolver::new()
            .with_component(lib("a").depends_on(m("b")))
            .with_component(lib("b").depends_on(m("c")))
            .with_component(lib("c").depends_on(m("a")));

        let err = resolve_graph(&resolver, &[m("a")]).unwrap_err();
        match err {
            GraphError::CircularDependency { cycle } => {
                assert_eq!(cycle, vec![m("a"), m("b"), m("c"), m("a")]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let resolver = StaticResolver::new().with_component(lib("a").depends_on(m("a")));
        assert!(matches!(
            resolve_graph(&resolver, &[m("a")]),
            Err(GraphError::CircularDependency { .. })
        ));
    }

    #[test]
    fn platform_nodes_are_skipped() {
        let resolver = StaticResolver::new()
            .with_component(lib("a").depends_on(m("bom")).depends_on(m("b")))
            .with_component(Component::platform(m("bom")))
            .with_component(lib("b"));

        let graph = resolve_graph(&resolver, &[m("a"), m("bom")]).unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.lookup(&m("bom")).is_none());
        let a = graph.lookup(&m("a")).unwrap();
        assert_eq!(graph.node(a).dependencies.len(), 1);
        assert_eq!(graph.roots().len(), 1);
    }

    #[test]
    fn missing_artifact_is_fatal() {
        let mut broken = lib("b");
        broken.artifact = None;
        let resolver = StaticResolver::new()
            .with_component(lib("a").depends_on(m("b")))
            .with_component(broken);

        let err = resolve_graph(&resolver, &[m("a")]).unwrap_err();
        assert!(matches!(err, GraphError::MissingArtifact { module } if module == m("b")));
    }

    #[test]
    fn unknown_component_names_parent() {
        let resolver = StaticResolver::new().with_component(lib("a").depends_on(m("ghost")));
        let err = resolve_graph(&resolver, &[m("a")]).unwrap_err();
        match err {
            GraphError::UnknownComponent {
                module,
                required_by,
            } => {
                assert_eq!(module, m("ghost"));
                assert_eq!(required_by, Some(m("a")));
            }
            other => panic!("expected unknown component, got {other:?}"),
        }
    }

    #[test]
    fn sources_attached_when_available() {
        let resolver = StaticResolver::new()
            .with_component(lib("a").depends_on(m("b")))
            .with_component(lib("b"))
            .with_sources(m("a"), "a-sources.jar");

        let graph = resolve_graph(&resolver, &[m("a")]).unwrap();
        let a = graph.lookup(&m("a")).unwrap();
        let b = graph.lookup(&m("b")).unwrap();
        assert!(graph.node(a).sources.is_some());
        assert!(graph.node(b).sources.is_none());
    }
}
