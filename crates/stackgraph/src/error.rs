//! Error types for graph construction, compilation and planning.
//!
//! Every error here is raised synchronously while a stack is being declared,
//! compiled or planned. Nothing in this crate is retried: a failing operation
//! leaves the graph exactly as it was before the call.

use crate::node::ResourceKind;
use crate::value::Attribute;

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while building or planning a resource graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Two resources share a name.
    #[error("resource '{name}' is already declared")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// A dependency, deferred value or export points at a resource that does not exist.
    #[error("unknown resource '{name}' referenced by {referenced_by}")]
    UnknownNode {
        /// The missing resource name.
        name: String,
        /// What held the dangling reference.
        referenced_by: String,
    },

    /// A resource depends on itself.
    #[error("resource '{name}' cannot depend on itself")]
    SelfDependency {
        /// The offending resource.
        name: String,
    },

    /// Declared and inferred edges form a cycle.
    #[error("dependency cycle detected: {}", format_cycle(.cycle))]
    CycleDetected {
        /// Names on the cycle, in traversal order.
        cycle: Vec<String>,
    },

    /// A deferred value cannot be turned into a wire-level reference.
    #[error("cannot resolve {target}.{attribute}: {reason}")]
    UnresolvableReference {
        /// Target resource name.
        target: String,
        /// Requested attribute.
        attribute: Attribute,
        /// Why the reference is invalid.
        reason: String,
    },

    /// An export names an attribute its resource kind does not produce.
    #[error("{kind} '{node}' has no attribute {attribute}")]
    UnknownAttribute {
        /// Resource the export points at.
        node: String,
        /// Kind of that resource.
        kind: ResourceKind,
        /// The attribute that was asked for.
        attribute: Attribute,
    },

    /// An attribute selector string is not recognised.
    #[error("unrecognised attribute selector '{0}'")]
    InvalidAttribute(String),

    /// A resource kind string is not recognised.
    #[error("unrecognised resource kind '{0}'")]
    InvalidKind(String),

    /// Two exports share a name.
    #[error("export '{name}' is already registered")]
    DuplicateExport {
        /// The repeated export name.
        name: String,
    },

    /// Two stacks in a set share a name.
    #[error("stack '{name}' is already part of this set")]
    DuplicateStack {
        /// The repeated stack name.
        name: String,
    },

    /// A stack imports an export that no stack in the set produces.
    #[error("stack '{stack}' imports '{export}', which no stack exports")]
    UnknownImport {
        /// The consuming stack.
        stack: String,
        /// The missing export name.
        export: String,
    },

    /// A sequence handed to emission is not a valid topological order.
    #[error("invalid deployment order: {0}")]
    InvalidOrder(String),

    /// The graph changed after the plan was built.
    #[error("plan for stack '{stack}' is out of date: its graph changed after planning")]
    StalePlan {
        /// Stack the plan belongs to.
        stack: String,
    },

    /// The worker pool used for parallel planning could not be created.
    #[error("failed to build planning thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Plan serialization failed.
    #[error("failed to serialize plan: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {}", cycle.join(" -> "), first),
        None => "<empty>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_closes_the_loop() {
        let err = GraphError::CycleDetected {
            cycle: vec!["x".to_string(), "y".to_string()],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: x -> y -> x");
    }

    #[test]
    fn test_unknown_node_message() {
        let err = GraphError::UnknownNode {
            name: "vpc".to_string(),
            referenced_by: "dependency of 'jump-box'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown resource 'vpc' referenced by dependency of 'jump-box'"
        );
    }
}
