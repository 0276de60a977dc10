//! Outcome and summary types for plan emission

use serde::{Deserialize, Serialize};

/// Result of submitting one planned resource to a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationOutcome {
    /// Resource did not exist and was created
    Created,
    /// Resource existed and was updated
    Updated,
    /// Backend reported nothing to do
    Unchanged,
    /// Backend rejected the resource
    Failed { error: String },
    /// Resource was not submitted
    Skipped { reason: String },
}

impl OperationOutcome {
    /// Check if the outcome represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the resource exists after this outcome
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Created | Self::Updated | Self::Unchanged)
    }
}

/// Summary of one emission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub exports_published: usize,
    /// Name and error of every failed resource, in plan order
    pub failures: Vec<(String, String)>,
}

impl EmitSummary {
    /// Check if emission was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.skipped + self.failed
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &EmitSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.exports_published += other.exports_published;
        self.failures.extend(other.failures.iter().cloned());
    }

    /// Add an outcome to the summary
    pub fn add_outcome(&mut self, name: &str, outcome: &OperationOutcome) {
        match outcome {
            OperationOutcome::Created => self.created += 1,
            OperationOutcome::Updated => self.updated += 1,
            OperationOutcome::Unchanged => self.unchanged += 1,
            OperationOutcome::Skipped { .. } => self.skipped += 1,
            OperationOutcome::Failed { error } => {
                self.failed += 1;
                self.failures.push((name.to_string(), error.clone()));
            }
        }
    }
}

/// Options for emission
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    /// Don't submit anything, just report what would be emitted
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}
