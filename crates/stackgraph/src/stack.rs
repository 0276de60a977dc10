//! A stack: one deployment unit with its graph and exports

use crate::error::{GraphError, Result};
use crate::export::{Export, ExportRegistry};
use crate::graph::DependencyGraph;
use crate::node::{Resource, ResourceExt, ResourceNode};
use crate::planner::ExecutionPlan;
use crate::value::Attribute;
use std::collections::BTreeSet;

/// A deployment unit
///
/// Exports are checked against the graph when they are declared, so a stack
/// never holds an export pointing at a missing resource or attribute.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    graph: DependencyGraph,
    exports: ExportRegistry,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: DependencyGraph::new(),
            exports: ExportRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn exports(&self) -> &ExportRegistry {
        &self.exports
    }

    /// Add a raw node
    pub fn add_node(&mut self, node: ResourceNode) -> Result<()> {
        self.graph.add_node(node)
    }

    /// Add a typed declaration
    pub fn add<R: Resource>(&mut self, resource: &R) -> Result<()> {
        self.graph.add_node(resource.to_node())
    }

    /// Declare that `from` must be applied after `to`
    pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<()> {
        self.graph.add_dependency(from, to)
    }

    /// Publish `resource.attribute` under `name`
    pub fn export(
        &mut self,
        name: impl Into<String>,
        resource: impl Into<String>,
        attribute: Attribute,
    ) -> Result<()> {
        let export = Export {
            name: name.into(),
            resource: resource.into(),
            attribute,
        };
        if self.exports.get(&export.name).is_some() {
            return Err(GraphError::DuplicateExport { name: export.name });
        }
        ExportRegistry::validate(&export, &self.graph)?;
        self.exports
            .register(export.name, export.resource, export.attribute)
    }

    /// Export names other stacks must provide, sorted
    pub fn imports(&self) -> BTreeSet<String> {
        let mut imports = BTreeSet::new();
        for node in self.graph.nodes() {
            for value in node.properties.values() {
                value.visit_imports(&mut |export| {
                    imports.insert(export.to_string());
                });
            }
        }
        imports
    }

    /// Infer edges, order, compile, and resolve exports
    pub fn plan(&mut self) -> Result<ExecutionPlan> {
        ExecutionPlan::build(&self.name, &mut self.graph, &self.exports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ResourceKind;
    use crate::value::{PropertyBag, PropertyValue, bag};

    #[derive(Debug)]
    struct Vpc;

    impl Resource for Vpc {
        fn name(&self) -> String {
            "vpc".into()
        }

        fn kind(&self) -> ResourceKind {
            ResourceKind::Network
        }

        fn properties(&self) -> PropertyBag {
            bag([("CidrBlock", "10.0.0.0/16")])
        }
    }

    #[test]
    fn test_add_typed_declaration() {
        let mut stack = Stack::new("network");
        stack.add(&Vpc).unwrap();
        assert_eq!(
            stack.graph().node("vpc").map(|node| node.kind),
            Some(ResourceKind::Network)
        );
        assert!(matches!(
            stack.add(&Vpc),
            Err(GraphError::DuplicateName { .. })
        ));
        assert_eq!(stack.graph().len(), 1);
    }

    #[test]
    fn test_export_checked_at_definition_time() {
        let mut stack = Stack::new("network");
        stack
            .add_node(ResourceNode::new("vpc", ResourceKind::Network))
            .unwrap();

        stack.export("vpc-id", "vpc", Attribute::Identifier).unwrap();
        assert!(matches!(
            stack.export("db-id", "database", Attribute::Identifier),
            Err(GraphError::UnknownNode { .. })
        ));
        assert!(matches!(
            stack.export("dns", "vpc", Attribute::DnsAddresses),
            Err(GraphError::UnknownAttribute { .. })
        ));
        assert!(matches!(
            stack.export("vpc-id", "vpc", Attribute::CidrBlock),
            Err(GraphError::DuplicateExport { .. })
        ));
        assert_eq!(stack.exports().len(), 1);
    }

    #[test]
    fn test_imports_are_collected() {
        let mut stack = Stack::new("directory");
        stack
            .add_node(
                ResourceNode::new("sg", ResourceKind::SecurityGroup)
                    .with_property("VpcId", PropertyValue::import("vpc-id"))
                    .with_property(
                        "Tags",
                        PropertyValue::List(vec![PropertyValue::import("env-tag")]),
                    ),
            )
            .unwrap();

        let imports: Vec<_> = stack.imports().into_iter().collect();
        assert_eq!(imports, vec!["env-tag", "vpc-id"]);
    }
}
