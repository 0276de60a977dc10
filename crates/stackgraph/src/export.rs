//! Export registry - named handles to resource attributes
//!
//! Exports decouple what a stack produces from where the values end up. The
//! backend persists each resolved export under its name (typically in a
//! shared parameter store) so other stacks can look values up without
//! reading this stack's graph.

use crate::compiler::reference_for;
use crate::error::{GraphError, Result};
use crate::graph::DependencyGraph;
use crate::value::{Attribute, DeferredValue, PropertyValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// A registered export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Export {
    /// Stable name other stacks look the value up by
    pub name: String,
    /// Resource that produces the value
    pub resource: String,
    pub attribute: Attribute,
}

/// Exports of one stack, in registration order
#[derive(Debug, Clone, Default)]
pub struct ExportRegistry {
    exports: Vec<Export>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an export
    ///
    /// Fails if the name is already taken. Whether the resource and attribute
    /// exist is checked against the graph by [`resolve_all`](Self::resolve_all).
    pub fn register(
        &mut self,
        name: impl Into<String>,
        resource: impl Into<String>,
        attribute: Attribute,
    ) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(GraphError::DuplicateExport { name });
        }
        self.exports.push(Export {
            name,
            resource: resource.into(),
            attribute,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|export| export.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Export> {
        self.exports.iter()
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    /// Check a single export against `graph`
    pub fn validate(export: &Export, graph: &DependencyGraph) -> Result<()> {
        let node = graph
            .node(&export.resource)
            .ok_or_else(|| GraphError::UnknownNode {
                name: export.resource.clone(),
                referenced_by: format!("export '{}'", export.name),
            })?;
        if !node.kind.supports(export.attribute) {
            return Err(GraphError::UnknownAttribute {
                node: node.name.clone(),
                kind: node.kind,
                attribute: export.attribute,
            });
        }
        Ok(())
    }

    /// Resolve every export to its wire-level reference
    ///
    /// Fails on the first export whose resource or attribute does not exist
    /// in `graph`.
    pub fn resolve_all(&self, graph: &DependencyGraph) -> Result<BTreeMap<String, PropertyValue>> {
        self.exports
            .iter()
            .map(|export| {
                Self::validate(export, graph)?;
                let deferred = DeferredValue::new(export.resource.clone(), export.attribute);
                let reference = reference_for(graph, &deferred)?;
                Ok((export.name.clone(), reference.to_property()))
            })
            .collect()
    }
}
