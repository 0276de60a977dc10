//! # Stackgraph
//!
//! Dependency-ordered resource graphs with deferred-value resolution.
//!
//! Some properties of a cloud resource are only known once another resource
//! has been provisioned: a directory's DNS addresses, a secret's generated
//! password. This crate represents such values as first-class
//! [`DeferredValue`]s, infers dependency edges from them, orders resources
//! so every one comes after what it depends on, and compiles property trees
//! into the wire-level references a provisioning backend resolves at apply
//! time.
//!
//! ## Core Concepts
//!
//! - **ResourceNode**: a named unit of desired state with a property bag
//! - **DependencyGraph**: nodes plus declared and inferred edges, ordered by DFS
//! - **Compiler**: replaces deferred values with wire-level references
//! - **ExportRegistry**: stable names for attributes other stacks import
//! - **ExecutionPlan**: the ordered, compiled result handed to a backend
//! - **StackSet**: several stacks planned in parallel, linked by imports
//!
//! ## Example
//!
//! ```
//! use stackgraph::{Attribute, PropertyValue, ResourceKind, ResourceNode, Stack};
//!
//! let mut stack = Stack::new("directory");
//! stack.add_node(ResourceNode::new("admin-secret", ResourceKind::Secret))?;
//! stack.add_node(
//!     ResourceNode::new("directory", ResourceKind::DirectoryService).with_property(
//!         "Password",
//!         PropertyValue::deferred("admin-secret", Attribute::GeneratedPassword),
//!     ),
//! )?;
//! stack.export("DirectoryId", "directory", Attribute::Identifier)?;
//!
//! let plan = stack.plan()?;
//! assert_eq!(plan.names(), vec!["admin-secret", "directory"]);
//! # Ok::<(), stackgraph::GraphError>(())
//! ```
//!
//! ## Provider Traits
//!
//! Emission is decoupled from any concrete engine or UI:
//!
//! - [`ProvisioningBackend`]: accepts planned resources and exports
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles user confirmations

pub mod compiler;
pub mod context;
pub mod emitter;
pub mod error;
pub mod export;
pub mod graph;
pub mod node;
pub mod planner;
pub mod stack;
pub mod stacks;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use compiler::{SECRET_PASSWORD_KEY, WireReference, compile, compile_value};
pub use context::{
    AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback, ProvisioningBackend,
};
pub use emitter::{emit, emit_simple};
pub use error::{GraphError, Result};
pub use export::{Export, ExportRegistry};
pub use graph::{DependencyGraph, RevisionStamp};
pub use node::{Resource, ResourceExt, ResourceKind, ResourceNode};
pub use planner::{ExecutionPlan, PlannedExport, PlannedResource};
pub use stack::Stack;
pub use stacks::StackSet;
pub use types::{EmitOptions, EmitSummary, OperationOutcome};
pub use value::{Attribute, DeferredValue, PropertyBag, PropertyValue, bag};
