//! Read-only commands: plan, validate, exports, graph

use anyhow::{Result, bail};
use colored::Colorize;
use stackgraph::{DependencyGraph, ResourceNode, StackSet};

use super::{load_stacks, plan_stacks};
use crate::Context;
use crate::cli::{GraphArgs, JobsArgs, OutputFormat, PlanArgs};
use crate::ui;

/// `stackplan plan`
pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let mut set = load_stacks(ctx)?;
    let plans = plan_stacks(&mut set, args.jobs.jobs, args.target.as_deref())?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
        OutputFormat::Text => {
            if plans.is_empty() {
                ui::warn("No resources match the target");
                return Ok(());
            }
            for plan in &plans {
                ui::print_plan(plan, ctx.verbose > 0);
            }
        }
    }
    Ok(())
}

/// `stackplan validate`
pub fn validate(ctx: &Context, args: JobsArgs) -> Result<()> {
    let mut set = load_stacks(ctx)?;
    let plans = set.plan_all(args.jobs)?;

    let waves = set.waves()?;
    let mut resources = 0;
    for plan in &plans {
        resources += plan.len();
        if !ctx.quiet {
            ui::kv(&plan.stack, &plan.fingerprint()?[..16]);
        }
    }
    ui::success(&format!(
        "{} stacks, {} resources valid ({} waves)",
        plans.len(),
        resources,
        waves.len()
    ));
    Ok(())
}

/// `stackplan exports`
pub fn exports(ctx: &Context, args: JobsArgs) -> Result<()> {
    let mut set = load_stacks(ctx)?;
    let plans = set.plan_all(args.jobs)?;

    let mut count = 0;
    for plan in &plans {
        if plan.exports.is_empty() {
            continue;
        }
        ui::header(&format!("Stack {}", plan.stack));
        for export in &plan.exports {
            ui::kv(
                &export.name,
                &format!("{}.{}", export.resource, export.attribute),
            );
            ui::dim(&ui::compact(&export.value));
            count += 1;
        }
    }

    if count == 0 {
        ui::info("No exports declared");
    }
    Ok(())
}

/// `stackplan graph`
pub fn graph(ctx: &Context, args: GraphArgs) -> Result<()> {
    let mut set = load_stacks(ctx)?;
    // Planning infers edges and fails on cycles before anything is printed
    set.plan_all(1)?;

    let stacks: Vec<_> = match &args.stack {
        Some(name) => match set.get(name) {
            Some(stack) => vec![stack],
            None => bail!("No stack named '{}'", name),
        },
        None => set.iter().collect(),
    };

    if args.dot {
        println!("{}", render_dot(&set, &stacks.iter().map(|s| s.name()).collect::<Vec<_>>()));
        return Ok(());
    }

    for stack in stacks {
        ui::header(&format!("Stack {}", stack.name()));
        print_edges(stack.graph());
        let imports = stack.imports();
        if !imports.is_empty() {
            ui::kv("imports", &imports.into_iter().collect::<Vec<_>>().join(", "));
        }
    }
    Ok(())
}

fn print_edges(graph: &DependencyGraph) {
    for node in graph.nodes() {
        let inferred = graph.inferred_dependencies(&node.name).unwrap_or_default();
        let deps = graph.dependencies(&node.name).unwrap_or_default();
        println!("  {} {}", node.name.bold(), format!("({})", node.kind).dimmed());
        for dep in deps {
            let origin = if only_inferred(node, dep, &inferred) {
                "inferred"
            } else {
                "declared"
            };
            println!("    → {} {}", dep, origin.dimmed());
        }
    }
}

/// True when the edge comes from a deferred value and was never declared
fn only_inferred(node: &ResourceNode, dep: &str, inferred: &[&str]) -> bool {
    inferred.contains(&dep) && !node.depends_on.iter().any(|d| d == dep)
}

/// Graphviz rendering; inferred edges are dashed
fn render_dot(set: &StackSet, names: &[&str]) -> String {
    let mut out = String::from("digraph stacks {\n  rankdir=LR;\n");
    for (idx, name) in names.iter().enumerate() {
        let Some(stack) = set.get(name) else { continue };
        let graph = stack.graph();
        out.push_str(&format!("  subgraph cluster_{idx} {{\n    label=\"{name}\";\n"));
        for node in graph.nodes() {
            out.push_str(&format!("    \"{name}/{}\" [label=\"{}\"];\n", node.name, node.name));
        }
        for node in graph.nodes() {
            let inferred = graph.inferred_dependencies(&node.name).unwrap_or_default();
            for dep in graph.dependencies(&node.name).unwrap_or_default() {
                let style = if only_inferred(node, dep, &inferred) {
                    " [style=dashed]"
                } else {
                    ""
                };
                out.push_str(&format!("    \"{name}/{}\" -> \"{name}/{dep}\"{style};\n", node.name));
            }
        }
        out.push_str("  }\n");
    }
    out.push_str("}\n");
    out
}
