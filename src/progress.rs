//! Progress indicators for emission

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use stackgraph::{EmitSummary, OperationOutcome, ProgressCallback};

/// Progress bar over the steps of one stack
pub struct EmitProgress {
    bar: ProgressBar,
    hidden: bool,
}

impl EmitProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            hidden: quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    #[cfg(test)]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressCallback for EmitProgress {
    fn on_plan_start(&mut self, stack: &str, count: usize) {
        self.bar = if self.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(count as u64)
        };
        self.bar.set_length(count as u64);
        self.bar.set_style(Self::style());
        self.bar.set_message(format!("Emitting {stack}"));
    }

    fn on_step_start(&mut self, name: &str, description: &str) {
        self.bar.set_message(format!("{name} ({description})"));
    }

    fn on_step_complete(&mut self, name: &str, outcome: &OperationOutcome) {
        let line = match outcome {
            OperationOutcome::Created => format!("  {} {} created", "✓".green(), name),
            OperationOutcome::Updated => format!("  {} {} updated", "✓".green(), name),
            OperationOutcome::Unchanged => format!("  {} {} unchanged", "○".dimmed(), name),
            OperationOutcome::Failed { error } => {
                format!("  {} {}: {}", "✗".red(), name, error)
            }
            OperationOutcome::Skipped { reason } => {
                format!("  {} {} skipped ({})", "⊘".yellow(), name, reason)
            }
        };
        if !self.hidden {
            self.bar.println(line);
        }
        self.bar.inc(1);
    }

    fn on_plan_complete(&mut self, _summary: &EmitSummary) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_progress_still_counts() {
        let mut progress = EmitProgress::new(true);
        progress.on_plan_start("network", 2);
        progress.on_step_start("Vpc", "AWS::EC2::VPC");
        progress.on_step_complete("Vpc", &OperationOutcome::Created);
        progress.on_step_complete(
            "Sg",
            &OperationOutcome::Skipped {
                reason: "dependency 'Vpc' was not applied".into(),
            },
        );
        assert_eq!(progress.position(), 2);
        progress.on_plan_complete(&EmitSummary::default());
    }
}
