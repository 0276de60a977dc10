//! Backend and callback traits for plan emission
//!
//! These traits keep the core free of any particular provisioning engine,
//! terminal UI, or prompt library.

use crate::planner::{PlannedExport, PlannedResource};
use crate::types::{EmitSummary, OperationOutcome};
use anyhow::Result;

/// The external system that turns a plan into real infrastructure
///
/// `apply` must be an idempotent create-or-update keyed by the step's name.
/// Apply-time markers in the step's properties are resolved by the backend
/// from values it generated earlier in the same run.
pub trait ProvisioningBackend: Send {
    /// Short name for logs and prompts
    fn name(&self) -> &str;

    /// Create or update one resource
    ///
    /// An `Err` is treated exactly like `OperationOutcome::Failed`.
    fn apply(&mut self, stack: &str, step: &PlannedResource) -> Result<OperationOutcome>;

    /// Persist export references under their names
    fn publish_exports(&mut self, stack: &str, exports: &[PlannedExport]) -> Result<()>;

    /// Called once after every step and export was handed over
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Progress callback for emission
pub trait ProgressCallback: Send {
    /// Called before the first step of a stack is submitted
    fn on_plan_start(&mut self, stack: &str, count: usize);

    /// Called when starting to submit a single resource
    fn on_step_start(&mut self, name: &str, description: &str);

    /// Called when a resource submission completes
    fn on_step_complete(&mut self, name: &str, outcome: &OperationOutcome);

    /// Called when the stack is done
    fn on_plan_complete(&mut self, summary: &EmitSummary);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// Returns `true` if the user confirmed.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_plan_start(&mut self, _stack: &str, _count: usize) {}
    fn on_step_start(&mut self, _name: &str, _description: &str) {}
    fn on_step_complete(&mut self, _name: &str, _outcome: &OperationOutcome) {}
    fn on_plan_complete(&mut self, _summary: &EmitSummary) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
