//! Error types for dependency resolution.

use relo_common::Module;

/// Errors that abort dependency resolution.
///
/// All variants are fatal: a graph that cannot be resolved completely is
/// never handed to the relocation engine.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The component graph contains a cycle. `cycle` starts and ends with
    /// the same module.
    #[error("circular dependency: {}", format_cycle(.cycle))]
    CircularDependency {
        /// The modules on the cycle, in traversal order.
        cycle: Vec<Module>,
    },

    /// A non-platform component has no binary artifact attached.
    #[error("no artifact file found for {module}")]
    MissingArtifact {
        /// The component without an artifact.
        module: Module,
    },

    /// A dependency edge points to a coordinate the collaborator never
    /// described.
    #[error("unknown component {module}{}", required_by_suffix(.required_by))]
    UnknownComponent {
        /// The coordinate that could not be found.
        module: Module,
        /// The component declaring the edge, if any.
        required_by: Option<Module>,
    },

    /// The resolution collaborator itself failed.
    #[error("dependency resolution failed: {0}")]
    Resolution(String),
}

fn format_cycle(cycle: &[Module]) -> String {
    cycle
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn required_by_suffix(required_by: &Option<Module>) -> String {
    match required_by {
        Some(parent) => format!(" (required by {parent})"),
        None => String::new(),
    }
}
