//! Dependency graph over resource nodes
//!
//! Edges come from two places: dependencies declared on a node (or added with
//! [`DependencyGraph::add_dependency`]) and edges inferred from the deferred
//! values embedded in a node's properties. The topological order is computed
//! with a three-color depth-first traversal and cached until the next
//! mutation.

use crate::error::{GraphError, Result};
use crate::node::ResourceNode;
use crate::value::visit_bag_deferred;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// A set of resource nodes and the edges between them
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Nodes in insertion order; positions double as node ids
    nodes: Vec<ResourceNode>,
    index: HashMap<String, usize>,
    /// Edges found by the last `infer_edges` run, per node, sorted
    inferred: Vec<Vec<usize>>,
    order: OnceLock<Vec<usize>>,
    revision: RevisionCounter,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node
    ///
    /// Every explicit dependency of the node must already be in the graph.
    /// On error the graph is unchanged.
    pub fn add_node(&mut self, mut node: ResourceNode) -> Result<()> {
        if self.index.contains_key(&node.name) {
            return Err(GraphError::DuplicateName { name: node.name });
        }
        if node.depends_on.contains(&node.name) {
            return Err(GraphError::SelfDependency { name: node.name });
        }
        if let Some(missing) = node
            .depends_on
            .iter()
            .find(|dep| !self.index.contains_key(dep.as_str()))
        {
            return Err(GraphError::UnknownNode {
                name: missing.clone(),
                referenced_by: format!("dependency of '{}'", node.name),
            });
        }

        let mut seen = BTreeSet::new();
        node.depends_on.retain(|dep| seen.insert(dep.clone()));

        log::debug!("Adding {} '{}'", node.kind, node.name);
        self.index.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(node);
        self.inferred.push(Vec::new());
        self.invalidate();
        Ok(())
    }

    /// Declare that `from` must be applied after `to`
    ///
    /// Adding an edge that already exists is a no-op. On error the graph is
    /// unchanged.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<()> {
        for name in [from, to] {
            if !self.index.contains_key(name) {
                return Err(GraphError::UnknownNode {
                    name: name.to_string(),
                    referenced_by: format!("dependency edge {from} -> {to}"),
                });
            }
        }
        if from == to {
            return Err(GraphError::SelfDependency {
                name: from.to_string(),
            });
        }

        let idx = self.index[from];
        let node = &mut self.nodes[idx];
        if node.depends_on.iter().any(|dep| dep == to) {
            return Ok(());
        }

        log::debug!("Adding dependency {} -> {}", from, to);
        node.depends_on.push(to.to_string());
        self.invalidate();
        Ok(())
    }

    /// Recompute the edges implied by deferred values
    ///
    /// Scans every node's properties recursively and adds an edge from the
    /// owning node to each referenced target. The inferred edge set is
    /// replaced wholesale, so running this twice yields the same edges.
    /// Returns the number of inferred edges.
    pub fn infer_edges(&mut self) -> Result<usize> {
        let mut inferred = Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let mut targets = BTreeSet::new();
            let mut failure = None;

            visit_bag_deferred(&node.properties, &mut |deferred| {
                if failure.is_some() {
                    return;
                }
                match self.index.get(&deferred.target) {
                    Some(_) if deferred.target == node.name => {
                        failure = Some(GraphError::SelfDependency {
                            name: node.name.clone(),
                        });
                    }
                    Some(&idx) => {
                        targets.insert(idx);
                    }
                    None => {
                        failure = Some(GraphError::UnknownNode {
                            name: deferred.target.clone(),
                            referenced_by: format!(
                                "deferred value {deferred} in '{}'",
                                node.name
                            ),
                        });
                    }
                }
            });

            if let Some(err) = failure {
                return Err(err);
            }
            inferred.push(targets.into_iter().collect::<Vec<_>>());
        }

        let count = inferred.iter().map(Vec::len).sum();
        if inferred != self.inferred {
            self.inferred = inferred;
            self.invalidate();
        }
        log::debug!("Inferred {} edges from deferred values", count);
        Ok(count)
    }

    /// Nodes ordered so that each appears after all of its dependencies
    ///
    /// Nodes with no ordering constraint between them keep their insertion
    /// order. The result is cached until the graph is mutated.
    pub fn topological_order(&self) -> Result<Vec<&ResourceNode>> {
        let order = match self.order.get() {
            Some(order) => order,
            None => {
                let computed = self.compute_order()?;
                self.order.get_or_init(|| computed)
            }
        };
        Ok(order.iter().map(|&idx| &self.nodes[idx]).collect())
    }

    /// Names in topological order
    pub fn order_names(&self) -> Result<Vec<String>> {
        Ok(self
            .topological_order()?
            .into_iter()
            .map(|node| node.name.clone())
            .collect())
    }

    /// Whether a topological order is cached for the current graph
    pub fn has_cached_order(&self) -> bool {
        self.order.get().is_some()
    }

    /// Check a proposed sequence against the current edges
    ///
    /// This does not consult the cache: every node must appear exactly once,
    /// after all of its dependencies.
    pub fn validate_order<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        if names.len() != self.nodes.len() {
            return Err(GraphError::InvalidOrder(format!(
                "expected {} resources, got {}",
                self.nodes.len(),
                names.len()
            )));
        }

        let mut position = vec![None; self.nodes.len()];
        for (pos, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let idx = *self.index.get(name).ok_or_else(|| {
                GraphError::InvalidOrder(format!("'{name}' is not part of the graph"))
            })?;
            if position[idx].replace(pos).is_some() {
                return Err(GraphError::InvalidOrder(format!("'{name}' appears twice")));
            }
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            for dep in self.dependency_indices(idx) {
                if position[dep] > position[idx] {
                    return Err(GraphError::InvalidOrder(format!(
                        "'{}' is ordered before its dependency '{}'",
                        node.name, self.nodes[dep].name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Stamp identifying the current revision of the graph
    pub fn revision(&self) -> RevisionStamp {
        self.revision.stamp()
    }

    /// Look up a node by name
    pub fn node(&self, name: &str) -> Option<&ResourceNode> {
        self.index.get(name).map(|&idx| &self.nodes[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct dependencies of `name`, declared and inferred, in insertion order
    pub fn dependencies(&self, name: &str) -> Option<Vec<&str>> {
        let idx = *self.index.get(name)?;
        Some(
            self.dependency_indices(idx)
                .into_iter()
                .map(|dep| self.nodes[dep].name.as_str())
                .collect(),
        )
    }

    /// Dependencies of `name` that were inferred from deferred values
    pub fn inferred_dependencies(&self, name: &str) -> Option<Vec<&str>> {
        let idx = *self.index.get(name)?;
        Some(
            self.inferred[idx]
                .iter()
                .map(|&dep| self.nodes[dep].name.as_str())
                .collect(),
        )
    }

    /// Total number of distinct edges
    pub fn edge_count(&self) -> usize {
        (0..self.nodes.len())
            .map(|idx| self.dependency_indices(idx).len())
            .sum()
    }

    fn dependency_indices(&self, idx: usize) -> Vec<usize> {
        let mut deps: Vec<usize> = self.nodes[idx]
            .depends_on
            .iter()
            .filter_map(|dep| self.index.get(dep).copied())
            .chain(self.inferred[idx].iter().copied())
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }

    fn invalidate(&mut self) {
        self.revision.bump();
        if self.order.take().is_some() {
            log::trace!("Discarded cached deployment order");
        }
    }

    fn compute_order(&self) -> Result<Vec<usize>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        // Frames of in-progress nodes, root first
        let mut path: Vec<Frame> = Vec::new();

        for root in 0..self.nodes.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            path.push(Frame::new(root, self.dependency_indices(root)));

            while let Some(frame) = path.last_mut() {
                let Some(&dep) = frame.deps.get(frame.cursor) else {
                    marks[frame.idx] = Mark::Done;
                    order.push(frame.idx);
                    path.pop();
                    continue;
                };
                frame.cursor += 1;

                match marks[dep] {
                    Mark::Done => {}
                    Mark::InProgress => return Err(self.cycle_error(&path, dep)),
                    Mark::Unvisited => {
                        marks[dep] = Mark::InProgress;
                        path.push(Frame::new(dep, self.dependency_indices(dep)));
                    }
                }
            }
        }

        log::debug!("Computed deployment order for {} resources", order.len());
        Ok(order)
    }

    /// Back-edge to `idx`: the cycle is the tail of the current path
    fn cycle_error(&self, path: &[Frame], idx: usize) -> GraphError {
        let start = path.iter().position(|frame| frame.idx == idx).unwrap_or(0);
        GraphError::CycleDetected {
            cycle: path[start..]
                .iter()
                .map(|frame| self.nodes[frame.idx].name.clone())
                .collect(),
        }
    }
}

/// A node being visited and the next dependency to descend into
struct Frame {
    idx: usize,
    deps: Vec<usize>,
    cursor: usize,
}

impl Frame {
    fn new(idx: usize, deps: Vec<usize>) -> Self {
        Self {
            idx,
            deps,
            cursor: 0,
        }
    }
}

/// Mutation counter of a graph, read by the plans built from it
#[derive(Debug, Default)]
struct RevisionCounter(Arc<AtomicU64>);

impl RevisionCounter {
    fn bump(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    fn stamp(&self) -> RevisionStamp {
        RevisionStamp {
            counter: Some(Arc::clone(&self.0)),
            seen: self.0.load(Ordering::Acquire),
        }
    }
}

impl Clone for RevisionCounter {
    // A cloned graph evolves on its own; plans of the original must not see its edits
    fn clone(&self) -> Self {
        Self(Arc::new(AtomicU64::new(self.0.load(Ordering::Acquire))))
    }
}

/// The graph revision a plan was built against
///
/// A stamp goes stale as soon as its graph gains a node or an edge. A default
/// stamp belongs to no graph and never goes stale.
#[derive(Debug, Clone, Default)]
pub struct RevisionStamp {
    counter: Option<Arc<AtomicU64>>,
    seen: u64,
}

impl RevisionStamp {
    /// Revision number at the time the stamp was taken
    pub fn revision(&self) -> u64 {
        self.seen
    }

    /// Whether the graph is still at the stamped revision
    pub fn is_current(&self) -> bool {
        self.counter
            .as_ref()
            .is_none_or(|counter| counter.load(Ordering::Acquire) == self.seen)
    }
}

impl PartialEq for RevisionStamp {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}
