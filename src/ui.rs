use colored::Colorize;
use stackgraph::{EmitSummary, ExecutionPlan, PropertyValue};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{num}/{total}]").blue().bold(), msg);
}

/// Single-line JSON for a property value
pub fn compact(value: &PropertyValue) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<unserializable>".to_string())
}

/// Shorten long values for display, keeping the start
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = text.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Print a plan: steps in order with their dependencies, then exports
pub fn print_plan(plan: &ExecutionPlan, verbose: bool) {
    header(&format!("Stack {}", plan.stack));

    let total = plan.len();
    for (idx, step) in plan.steps.iter().enumerate() {
        let deps = if step.depends_on.is_empty() {
            String::new()
        } else {
            format!(" ← {}", step.depends_on.join(", ")).dimmed().to_string()
        };
        self::step(
            idx + 1,
            total,
            &format!("{} {}{}", step.name.bold(), step.provider_type.cyan(), deps),
        );
        if verbose {
            for (key, value) in &step.properties {
                dim(&format!("{key} = {}", truncate(&compact(value), 100)));
            }
        }
    }

    if !plan.exports.is_empty() {
        println!();
        println!("  {}", "Exports".cyan().bold());
        for export in &plan.exports {
            kv(
                &export.name,
                &format!("{}.{} {}", export.resource, export.attribute, compact(&export.value).dimmed()),
            );
        }
    }
}

/// Print final emission summary
pub fn print_summary(summary: &EmitSummary) {
    println!();
    if summary.is_success() {
        success(&format!("Emitted {} resources", summary.total()));
    } else {
        warn("Emitted with errors");
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} resources updated", summary.updated);
    }
    if summary.unchanged > 0 {
        println!("    • {} resources unchanged", summary.unchanged);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.exports_published > 0 {
        println!("    • {} exports published", summary.exports_published);
    }
    for (name, error) in &summary.failures {
        println!("    • {} {}: {}", "failed".red(), name, error);
    }
}
