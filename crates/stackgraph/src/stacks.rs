//! Stack sets - several deployment units linked only through exports
//!
//! A stack reads another stack's value exclusively by importing one of its
//! exports. Stacks are planned in waves: a stack is planned only after every
//! stack it imports from has a complete plan, and the stacks of one wave are
//! planned in parallel because no graph is shared between them.

use crate::error::{GraphError, Result};
use crate::planner::ExecutionPlan;
use crate::stack::Stack;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// An ordered collection of uniquely named stacks
#[derive(Debug, Clone, Default)]
pub struct StackSet {
    stacks: Vec<Stack>,
}

impl StackSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stack; names must be unique
    pub fn add(&mut self, stack: Stack) -> Result<()> {
        if self.get(stack.name()).is_some() {
            return Err(GraphError::DuplicateStack {
                name: stack.name().to_string(),
            });
        }
        self.stacks.push(stack);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|stack| stack.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.iter()
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Map every export name to the index of the stack producing it
    fn producers(&self) -> Result<HashMap<&str, usize>> {
        let mut producers = HashMap::new();
        for (idx, stack) in self.stacks.iter().enumerate() {
            for export in stack.exports().iter() {
                if producers.insert(export.name.as_str(), idx).is_some() {
                    return Err(GraphError::DuplicateExport {
                        name: export.name.clone(),
                    });
                }
            }
        }
        Ok(producers)
    }

    /// Stack indices each stack imports from
    fn import_edges(&self) -> Result<Vec<Vec<usize>>> {
        let producers = self.producers()?;
        self.stacks
            .iter()
            .map(|stack| {
                let mut deps = Vec::new();
                for export in stack.imports() {
                    let producer =
                        producers
                            .get(export.as_str())
                            .ok_or_else(|| GraphError::UnknownImport {
                                stack: stack.name().to_string(),
                                export: export.clone(),
                            })?;
                    if !deps.contains(producer) {
                        deps.push(*producer);
                    }
                }
                Ok(deps)
            })
            .collect()
    }

    fn wave_indices(&self) -> Result<Vec<Vec<usize>>> {
        let edges = self.import_edges()?;
        let mut placed: HashSet<usize> = HashSet::new();
        let mut waves = Vec::new();

        while placed.len() < self.stacks.len() {
            let wave: Vec<usize> = (0..self.stacks.len())
                .filter(|idx| !placed.contains(idx))
                .filter(|idx| edges[*idx].iter().all(|dep| placed.contains(dep)))
                .collect();
            if wave.is_empty() {
                return Err(self.import_cycle(&edges, &placed));
            }
            placed.extend(wave.iter().copied());
            waves.push(wave);
        }
        Ok(waves)
    }

    /// Walk unplaced import edges until a stack repeats
    fn import_cycle(&self, edges: &[Vec<usize>], placed: &HashSet<usize>) -> GraphError {
        let mut path: Vec<usize> = Vec::new();
        let mut current = (0..self.stacks.len()).find(|idx| !placed.contains(idx));

        while let Some(idx) = current {
            if let Some(start) = path.iter().position(|&p| p == idx) {
                return GraphError::CycleDetected {
                    cycle: path[start..]
                        .iter()
                        .map(|&p| self.stacks[p].name().to_string())
                        .collect(),
                };
            }
            path.push(idx);
            current = edges[idx].iter().copied().find(|dep| !placed.contains(dep));
        }

        GraphError::CycleDetected {
            cycle: path
                .iter()
                .map(|&p| self.stacks[p].name().to_string())
                .collect(),
        }
    }

    /// Stack names grouped into planning waves
    ///
    /// Every stack appears after all stacks it imports from. Within a wave,
    /// stacks keep insertion order.
    pub fn waves(&self) -> Result<Vec<Vec<String>>> {
        Ok(self
            .wave_indices()?
            .into_iter()
            .map(|wave| {
                wave.into_iter()
                    .map(|idx| self.stacks[idx].name().to_string())
                    .collect()
            })
            .collect())
    }

    /// Plan every stack, wave by wave, with up to `jobs` stacks in parallel
    ///
    /// Plans are returned in wave order. Before a wave starts, each of its
    /// imports is checked against the finished plan of the producing stack.
    pub fn plan_all(&mut self, jobs: usize) -> Result<Vec<ExecutionPlan>> {
        let waves = self.wave_indices()?;
        let producers: HashMap<String, usize> = self
            .producers()?
            .into_iter()
            .map(|(name, idx)| (name.to_string(), idx))
            .collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .build()?;

        let mut plans: Vec<Option<ExecutionPlan>> = (0..self.stacks.len()).map(|_| None).collect();
        let mut ordered = Vec::with_capacity(self.stacks.len());

        for (number, wave) in waves.iter().enumerate() {
            for &idx in wave {
                let stack = &self.stacks[idx];
                for export in stack.imports() {
                    let published = producers
                        .get(&export)
                        .and_then(|producer| plans[*producer].as_ref())
                        .is_some_and(|plan| plan.exports.iter().any(|e| e.name == export));
                    if !published {
                        return Err(GraphError::UnknownImport {
                            stack: stack.name().to_string(),
                            export,
                        });
                    }
                }
            }

            log::debug!("Planning wave {} with {} stacks", number + 1, wave.len());
            let members: Vec<(usize, &mut Stack)> = self
                .stacks
                .iter_mut()
                .enumerate()
                .filter(|(idx, _)| wave.contains(idx))
                .collect();
            let results: Vec<(usize, Result<ExecutionPlan>)> = pool.install(|| {
                members
                    .into_par_iter()
                    .map(|(idx, stack)| (idx, stack.plan()))
                    .collect()
            });

            for (idx, result) in results {
                let plan = result?;
                ordered.push(idx);
                plans[idx] = Some(plan);
            }
        }

        log::info!("Planned {} stacks in {} waves", self.stacks.len(), waves.len());
        Ok(ordered
            .into_iter()
            .filter_map(|idx| plans[idx].take())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ResourceKind, ResourceNode};
    use crate::value::{Attribute, PropertyValue};

    fn producer(name: &str, export: &str) -> Stack {
        let mut stack = Stack::new(name);
        stack
            .add_node(ResourceNode::new("vpc", ResourceKind::Network))
            .unwrap();
        stack.export(export, "vpc", Attribute::Identifier).unwrap();
        stack
    }

    fn consumer(name: &str, import: &str) -> Stack {
        let mut stack = Stack::new(name);
        stack
            .add_node(
                ResourceNode::new("sg", ResourceKind::SecurityGroup)
                    .with_property("VpcId", PropertyValue::import(import)),
            )
            .unwrap();
        stack
    }

    #[test]
    fn test_duplicate_stack_rejected() {
        let mut set = StackSet::new();
        set.add(Stack::new("network")).unwrap();
        assert!(matches!(
            set.add(Stack::new("network")),
            Err(GraphError::DuplicateStack { .. })
        ));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_waves_follow_imports() {
        let mut set = StackSet::new();
        set.add(consumer("app", "vpc-id")).unwrap();
        set.add(producer("network", "vpc-id")).unwrap();
        set.add(producer("shared", "shared-vpc")).unwrap();

        assert_eq!(
            set.waves().unwrap(),
            vec![vec!["network".to_string(), "shared".to_string()], vec!["app".to_string()]]
        );
    }

    #[test]
    fn test_plan_all_completes_producers_first() {
        let mut set = StackSet::new();
        set.add(consumer("app", "vpc-id")).unwrap();
        set.add(producer("network", "vpc-id")).unwrap();

        let plans = set.plan_all(2).unwrap();
        let names: Vec<_> = plans.iter().map(|plan| plan.stack.as_str()).collect();
        assert_eq!(names, vec!["network", "app"]);
        assert_eq!(
            serde_json::to_value(&plans[1].steps[0].properties["VpcId"]).unwrap(),
            serde_json::json!({ "Fn::ImportValue": "vpc-id" })
        );
    }

    #[test]
    fn test_unknown_import() {
        let mut set = StackSet::new();
        set.add(consumer("app", "vpc-id")).unwrap();
        assert!(matches!(
            set.plan_all(1),
            Err(GraphError::UnknownImport { stack, export }) if stack == "app" && export == "vpc-id"
        ));
    }

    #[test]
    fn test_export_names_are_global() {
        let mut set = StackSet::new();
        set.add(producer("a", "vpc-id")).unwrap();
        set.add(producer("b", "vpc-id")).unwrap();
        assert!(matches!(set.waves(), Err(GraphError::DuplicateExport { .. })));
    }

    #[test]
    fn test_import_cycle_between_stacks() {
        let mut a = producer("a", "a-vpc");
        a.add_node(
            ResourceNode::new("sg", ResourceKind::SecurityGroup)
                .with_property("VpcId", PropertyValue::import("b-vpc")),
        )
        .unwrap();
        let mut b = producer("b", "b-vpc");
        b.add_node(
            ResourceNode::new("sg", ResourceKind::SecurityGroup)
                .with_property("VpcId", PropertyValue::import("a-vpc")),
        )
        .unwrap();

        let mut set = StackSet::new();
        set.add(a).unwrap();
        set.add(b).unwrap();
        set.add(producer("c", "c-vpc")).unwrap();

        match set.plan_all(4) {
            Err(GraphError::CycleDetected { cycle }) => assert_eq!(cycle, vec!["a", "b"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_stack_fails_the_set() {
        let mut broken = Stack::new("broken");
        broken
            .add_node(
                ResourceNode::new("sg", ResourceKind::SecurityGroup)
                    .with_property("VpcId", PropertyValue::deferred("missing", Attribute::Identifier)),
            )
            .unwrap();
        let mut set = StackSet::new();
        set.add(producer("network", "vpc-id")).unwrap();
        set.add(broken).unwrap();
        assert!(matches!(set.plan_all(2), Err(GraphError::UnknownNode { .. })));
    }

    #[test]
    fn test_deep_stack_plans_on_worker_threads() {
        const LEN: usize = 20_000;
        let mut stack = Stack::new("deep");
        // Forward references make the dependency walk LEN levels deep
        for i in 0..LEN {
            let mut node = ResourceNode::new(format!("n{i}"), ResourceKind::Secret);
            if i + 1 < LEN {
                node = node.with_property(
                    "Next",
                    PropertyValue::deferred(format!("n{}", i + 1), Attribute::Identifier),
                );
            }
            stack.add_node(node).unwrap();
        }
        let mut set = StackSet::new();
        set.add(stack).unwrap();

        let plans = set.plan_all(2).unwrap();
        assert_eq!(plans[0].len(), LEN);
        assert_eq!(plans[0].names()[0], format!("n{}", LEN - 1));
    }
}
