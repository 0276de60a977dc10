//! Execution planner - builds ordered, compiled deployment plans

use crate::compiler::compile;
use crate::error::{GraphError, Result};
use crate::export::ExportRegistry;
use crate::graph::{DependencyGraph, RevisionStamp};
use crate::node::ResourceKind;
use crate::value::{Attribute, PropertyBag, PropertyValue};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One resource ready for submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedResource {
    pub name: String,
    pub kind: ResourceKind,
    /// Resource type name for the backend
    pub provider_type: String,
    /// Compiled properties; contains no deferred values
    pub properties: PropertyBag,
    /// Direct dependencies, declared and inferred
    pub depends_on: Vec<String>,
}

/// One export with its wire-level reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedExport {
    pub name: String,
    pub resource: String,
    pub attribute: Attribute,
    pub value: PropertyValue,
}

/// An ordered sequence of compiled resources plus the stack's exports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPlan {
    /// Stack the plan was built from
    pub stack: String,
    /// Resources in deployment order
    pub steps: Vec<PlannedResource>,
    pub exports: Vec<PlannedExport>,
    /// Graph revision the order was computed against
    #[serde(skip)]
    pub revision: RevisionStamp,
}

impl ExecutionPlan {
    /// Build a plan from a graph and its exports
    ///
    /// Edges are re-inferred, the graph is ordered (failing on cycles), every
    /// node's properties are compiled and every export resolved. Either the
    /// whole plan is produced or nothing is.
    pub fn build(stack: &str, graph: &mut DependencyGraph, exports: &ExportRegistry) -> Result<Self> {
        let inferred = graph.infer_edges()?;
        let graph: &DependencyGraph = graph;

        let steps = graph
            .topological_order()?
            .into_iter()
            .map(|node| {
                Ok(PlannedResource {
                    name: node.name.clone(),
                    kind: node.kind,
                    provider_type: node.kind.provider_type().to_string(),
                    properties: compile(&node.properties, graph)?,
                    depends_on: graph
                        .dependencies(&node.name)
                        .unwrap_or_default()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut resolved = exports.resolve_all(graph)?;
        let exports = exports
            .iter()
            .filter_map(|export| {
                resolved.remove(&export.name).map(|value| PlannedExport {
                    name: export.name.clone(),
                    resource: export.resource.clone(),
                    attribute: export.attribute,
                    value,
                })
            })
            .collect();

        let plan = Self {
            stack: stack.to_string(),
            steps,
            exports,
            revision: graph.revision(),
        };
        graph.validate_order(plan.names().as_slice())?;

        log::info!(
            "Planned stack '{}': {} resources, {} inferred edges, {} exports",
            plan.stack,
            plan.steps.len(),
            inferred,
            plan.exports.len()
        );
        Ok(plan)
    }

    /// Resource names in deployment order
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name.as_str()).collect()
    }

    pub fn step(&self, name: &str) -> Option<&PlannedResource> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// Check that every step comes after its dependencies
    ///
    /// Plans can be edited or filtered after they are built, so emission runs
    /// this again rather than trusting how the plan was produced.
    pub fn validate_order(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if let Some(dep) = step.depends_on.iter().find(|dep| !seen.contains(dep.as_str())) {
                return Err(GraphError::InvalidOrder(format!(
                    "'{}' is ordered before its dependency '{}'",
                    step.name, dep
                )));
            }
            if !seen.insert(step.name.as_str()) {
                return Err(GraphError::InvalidOrder(format!(
                    "'{}' appears twice",
                    step.name
                )));
            }
        }
        Ok(())
    }

    /// Fail if the graph gained nodes or edges after this plan was built
    pub fn ensure_current(&self) -> Result<()> {
        if self.revision.is_current() {
            Ok(())
        } else {
            Err(GraphError::StalePlan {
                stack: self.stack.clone(),
            })
        }
    }

    /// Filter plan to the matching resources and everything they depend on
    ///
    /// Target format: "kind" or "kind.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                self.retain_with_dependencies(|step| {
                    matches_filter(step, kind.as_deref(), name.as_deref())
                })
            }
        }
    }

    fn retain_with_dependencies<F>(self, predicate: F) -> Self
    where
        F: Fn(&PlannedResource) -> bool,
    {
        let by_name: HashMap<&str, &PlannedResource> = self
            .steps
            .iter()
            .map(|step| (step.name.as_str(), step))
            .collect();

        let mut keep: HashSet<String> = HashSet::new();
        let mut pending: Vec<&str> = self
            .steps
            .iter()
            .filter(|step| predicate(step))
            .map(|step| step.name.as_str())
            .collect();

        while let Some(name) = pending.pop() {
            if !keep.insert(name.to_string()) {
                continue;
            }
            if let Some(step) = by_name.get(name) {
                pending.extend(step.depends_on.iter().map(String::as_str));
            }
        }

        Self {
            stack: self.stack,
            steps: self
                .steps
                .into_iter()
                .filter(|step| keep.contains(&step.name))
                .collect(),
            exports: self
                .exports
                .into_iter()
                .filter(|export| keep.contains(&export.resource))
                .collect(),
            revision: self.revision,
        }
    }

    /// Pretty JSON for the backend or for display
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Content hash of the plan
    ///
    /// Equal declared stacks produce equal fingerprints.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Parse a target string like "kind.name" into (kind, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if a step matches the filter criteria
fn matches_filter(step: &PlannedResource, kind: Option<&str>, name: Option<&str>) -> bool {
    if let Some(k) = kind {
        // Allow common aliases
        let matches_kind = match k {
            "compute" | "instances" => step.kind == ResourceKind::ComputeInstance,
            "directory" => step.kind == ResourceKind::DirectoryService,
            "documents" => step.kind == ResourceKind::AutomationDocument,
            "iam" => matches!(step.kind, ResourceKind::Role | ResourceKind::InstanceProfile),
            _ => step.kind.as_str() == k || step.kind.as_str().starts_with(k),
        };
        if !matches_kind {
            return false;
        }
    }

    if let Some(n) = name
        && !step.name.contains(n)
    {
        return false;
    }

    true
}
