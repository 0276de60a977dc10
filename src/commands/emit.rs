//! `stackplan emit` - hand plans to the template backend

use anyhow::{Result, bail};
use colored::Colorize;
use std::path::PathBuf;

use stackgraph::{AutoConfirm, ConfirmCallback, EmitOptions, EmitSummary, ExecutionPlan, emit};

use super::{load_stacks, plan_stacks};
use crate::Context;
use crate::backend::TemplateBackend;
use crate::cli::EmitArgs;
use crate::progress::EmitProgress;
use crate::ui;

/// Confirmation through an interactive prompt
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

pub fn run(ctx: &Context, args: EmitArgs) -> Result<()> {
    let mut set = load_stacks(ctx)?;
    let plans = plan_stacks(&mut set, args.jobs.jobs, args.target.as_deref())?;
    if plans.is_empty() {
        ui::warn("Nothing to emit");
        return Ok(());
    }

    let opts = EmitOptions {
        dry_run: args.dry_run,
        verbose: ctx.verbose > 0,
    };
    let out = args.out.as_deref().map(|dir| PathBuf::from(shellexpand::tilde(dir).as_ref()));

    let summary = if args.yes {
        emit_all(ctx, &plans, out.as_ref(), &opts, &mut AutoConfirm)?
    } else {
        emit_all(ctx, &plans, out.as_ref(), &opts, &mut PromptConfirm)?
    };

    if opts.dry_run {
        println!();
        println!("  {} Dry run - nothing written", "ℹ".blue());
        return Ok(());
    }

    if !ctx.quiet {
        ui::print_summary(&summary);
    }
    if !summary.is_success() {
        bail!("{} resources failed", summary.failed);
    }
    Ok(())
}

/// Emit plans in wave order; stop at the first stack with failures
fn emit_all<C: ConfirmCallback>(
    ctx: &Context,
    plans: &[ExecutionPlan],
    out: Option<&PathBuf>,
    opts: &EmitOptions,
    confirm: &mut C,
) -> Result<EmitSummary> {
    let mut total = EmitSummary::default();

    for plan in plans {
        if opts.dry_run && !ctx.quiet {
            ui::print_plan(plan, opts.verbose);
        }

        let destination = out.map(|dir| TemplateBackend::template_path(dir, &plan.stack));
        let mut backend = TemplateBackend::new(&plan.stack, destination);
        let mut progress = EmitProgress::new(ctx.quiet || out.is_none());

        let summary = emit(plan, &mut backend, opts, &mut progress, confirm)?;
        total.merge(&summary);

        if !summary.is_success() {
            ui::error(&format!(
                "Stack '{}' had failures; later stacks were not emitted",
                plan.stack
            ));
            break;
        }
    }

    Ok(total)
}
