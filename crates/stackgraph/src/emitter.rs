//! Plan emission - hands an ordered plan to a provisioning backend

use crate::context::{AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback, ProvisioningBackend};
use crate::planner::{ExecutionPlan, PlannedExport};
use crate::types::{EmitOptions, EmitSummary, OperationOutcome};
use anyhow::{Context, Result};
use std::collections::HashSet;

/// Emit a plan through `backend`
///
/// The plan's order is re-validated first, whatever happened to it since it
/// was built, and a plan whose graph gained nodes or edges afterwards is
/// refused. Steps are submitted strictly in plan order. A step whose
/// dependency did not end up applied is skipped rather than submitted, and
/// only exports whose resource was applied are published. Retries and
/// rollback belong to the backend.
pub fn emit<B, P, C>(
    plan: &ExecutionPlan,
    backend: &mut B,
    opts: &EmitOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<EmitSummary>
where
    B: ProvisioningBackend + ?Sized,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    plan.ensure_current()
        .and_then(|()| plan.validate_order())
        .with_context(|| format!("Plan for stack '{}' is not emittable", plan.stack))?;

    if plan.is_empty() && plan.exports.is_empty() {
        return Ok(EmitSummary::default());
    }

    if opts.dry_run {
        log::info!(
            "Dry run: would emit {} resources for stack '{}' to {}",
            plan.len(),
            plan.stack,
            backend.name()
        );
        let mut summary = EmitSummary::default();
        for step in &plan.steps {
            summary.add_outcome(
                &step.name,
                &OperationOutcome::Skipped {
                    reason: "Dry run".into(),
                },
            );
        }
        return Ok(summary);
    }

    let prompt = format!(
        "Emit {} resources for stack '{}' to {}?",
        plan.len(),
        plan.stack,
        backend.name()
    );
    if !confirm.confirm(&prompt)? {
        log::info!("Emission of stack '{}' declined", plan.stack);
        return Ok(EmitSummary {
            skipped: plan.len(),
            ..Default::default()
        });
    }

    let mut summary = EmitSummary::default();
    let mut applied: HashSet<&str> = HashSet::new();

    progress.on_plan_start(&plan.stack, plan.len());
    for step in &plan.steps {
        progress.on_step_start(&step.name, &step.provider_type);

        let blocked = step
            .depends_on
            .iter()
            .find(|dep| !applied.contains(dep.as_str()));
        let outcome = match blocked {
            Some(dep) => OperationOutcome::Skipped {
                reason: format!("dependency '{dep}' was not applied"),
            },
            None => match backend.apply(&plan.stack, step) {
                Ok(outcome) => outcome,
                Err(e) => OperationOutcome::Failed {
                    error: format!("{e:#}"),
                },
            },
        };

        if outcome.is_applied() {
            applied.insert(step.name.as_str());
        } else {
            log::warn!("{} '{}': {:?}", step.provider_type, step.name, outcome);
        }
        progress.on_step_complete(&step.name, &outcome);
        summary.add_outcome(&step.name, &outcome);
    }

    let publishable: Vec<PlannedExport> = plan
        .exports
        .iter()
        .filter(|export| applied.contains(export.resource.as_str()))
        .cloned()
        .collect();
    if !publishable.is_empty() {
        backend
            .publish_exports(&plan.stack, &publishable)
            .with_context(|| format!("Failed to publish exports of stack '{}'", plan.stack))?;
        summary.exports_published = publishable.len();
    }
    backend.finish()?;

    progress.on_plan_complete(&summary);
    log::debug!(
        "Emitted stack '{}': {} applied, {} failed, {} skipped",
        plan.stack,
        applied.len(),
        summary.failed,
        summary.skipped
    );
    Ok(summary)
}

/// Simple emission without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn emit_simple<B>(plan: &ExecutionPlan, backend: &mut B, opts: &EmitOptions) -> Result<EmitSummary>
where
    B: ProvisioningBackend + ?Sized,
{
    emit(plan, backend, opts, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AutoDecline;
    use crate::node::{ResourceKind, ResourceNode};
    use crate::planner::PlannedResource;
    use crate::stack::Stack;
    use crate::value::{Attribute, PropertyValue};

    /// Records every call; fails the resources named in `fail`
    #[derive(Default)]
    struct MockBackend {
        fail: Vec<String>,
        applied: Vec<String>,
        published: Vec<String>,
        finished: bool,
    }

    impl ProvisioningBackend for MockBackend {
        fn name(&self) -> &str {
            "mock"
        }

        fn apply(&mut self, _stack: &str, step: &PlannedResource) -> Result<OperationOutcome> {
            if self.fail.contains(&step.name) {
                anyhow::bail!("backend refused {}", step.name);
            }
            self.applied.push(step.name.clone());
            Ok(OperationOutcome::Created)
        }

        fn publish_exports(&mut self, _stack: &str, exports: &[PlannedExport]) -> Result<()> {
            self.published
                .extend(exports.iter().map(|export| export.name.clone()));
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Vec<String>,
    }

    impl ProgressCallback for RecordingProgress {
        fn on_plan_start(&mut self, stack: &str, count: usize) {
            self.events.push(format!("start {stack} {count}"));
        }
        fn on_step_start(&mut self, _name: &str, _description: &str) {}
        fn on_step_complete(&mut self, name: &str, outcome: &OperationOutcome) {
            self.events.push(format!("{name} {}", outcome.is_applied()));
        }
        fn on_plan_complete(&mut self, summary: &EmitSummary) {
            self.events.push(format!("done {}", summary.total()));
        }
    }

    fn plan() -> ExecutionPlan {
        let mut stack = Stack::new("env");
        stack
            .add_node(ResourceNode::new("vpc", ResourceKind::Network))
            .unwrap();
        stack
            .add_node(
                ResourceNode::new("sg", ResourceKind::SecurityGroup)
                    .with_property("VpcId", PropertyValue::deferred("vpc", Attribute::Identifier)),
            )
            .unwrap();
        stack
            .add_node(ResourceNode::new("secret", ResourceKind::Secret))
            .unwrap();
        stack.export("vpc-id", "vpc", Attribute::Identifier).unwrap();
        stack.export("sg-id", "sg", Attribute::Identifier).unwrap();
        stack.plan().unwrap()
    }

    #[test]
    fn test_emits_in_order_and_publishes() {
        let mut backend = MockBackend::default();
        let mut progress = RecordingProgress::default();
        let summary = emit(
            &plan(),
            &mut backend,
            &EmitOptions::default(),
            &mut progress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(backend.applied, vec!["vpc", "sg", "secret"]);
        assert_eq!(backend.published, vec!["vpc-id", "sg-id"]);
        assert!(backend.finished);
        assert_eq!(summary.created, 3);
        assert_eq!(summary.exports_published, 2);
        assert_eq!(progress.events.first().unwrap(), "start env 3");
        assert_eq!(progress.events.last().unwrap(), "done 3");
    }

    #[test]
    fn test_dependents_of_failures_are_skipped() {
        let mut backend = MockBackend {
            fail: vec!["vpc".into()],
            ..Default::default()
        };
        let summary = emit_simple(&plan(), &mut backend, &EmitOptions::default()).unwrap();

        assert_eq!(backend.applied, vec!["secret"]);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.created, 1);
        assert!(summary.failures[0].1.contains("backend refused vpc"));
        assert!(backend.published.is_empty());
        assert_eq!(summary.exports_published, 0);
    }

    #[test]
    fn test_dry_run_submits_nothing() {
        let mut backend = MockBackend::default();
        let opts = EmitOptions {
            dry_run: true,
            ..Default::default()
        };
        let summary = emit_simple(&plan(), &mut backend, &opts).unwrap();
        assert!(backend.applied.is_empty());
        assert!(!backend.finished);
        assert_eq!(summary.skipped, 3);
    }

    #[test]
    fn test_declined_confirmation() {
        let mut backend = MockBackend::default();
        let summary = emit(
            &plan(),
            &mut backend,
            &EmitOptions::default(),
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();
        assert!(backend.applied.is_empty());
        assert_eq!(summary.skipped, 3);
    }

    #[test]
    fn test_reordered_plan_is_rejected() {
        let mut plan = plan();
        plan.steps.swap(0, 1);
        let mut backend = MockBackend::default();
        let err = emit_simple(&plan, &mut backend, &EmitOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("ordered before its dependency"));
        assert!(backend.applied.is_empty());
    }

    #[test]
    fn test_plan_built_before_new_edge_is_refused() {
        let mut stack = Stack::new("env");
        stack
            .add_node(ResourceNode::new("a", ResourceKind::Secret))
            .unwrap();
        stack
            .add_node(ResourceNode::new("b", ResourceKind::Secret))
            .unwrap();
        let stale = stack.plan().unwrap();
        assert_eq!(stale.names(), vec!["a", "b"]);

        stack.add_dependency("a", "b").unwrap();
        let mut backend = MockBackend::default();
        let err = emit_simple(&stale, &mut backend, &EmitOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("out of date"));
        assert!(backend.applied.is_empty());
        assert!(!backend.finished);

        let fresh = stack.plan().unwrap();
        emit_simple(&fresh, &mut backend, &EmitOptions::default()).unwrap();
        assert_eq!(backend.applied, vec!["b", "a"]);
    }
}
