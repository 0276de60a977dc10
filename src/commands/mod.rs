// Planning and inspection
pub mod plan;

// Template emission
pub mod emit;

use anyhow::{Result, bail};
use stackgraph::{ExecutionPlan, StackSet};

use crate::Context;
use crate::schema::{Manifest, manifest_path};

/// Load the manifest (and blueprint) named by the global flags
pub fn load_stacks(ctx: &Context) -> Result<StackSet> {
    let path = manifest_path(ctx.manifest.as_deref());

    let manifest = if path.exists() {
        log::debug!("Loading manifest {}", path.display());
        Manifest::load(&path)?
    } else if ctx.builtin {
        Manifest::default()
    } else {
        bail!(
            "No manifest at {} (pass --manifest, or --builtin for the directory environment)",
            path.display()
        );
    };

    let set = manifest.into_stack_set(ctx.builtin)?;
    if set.is_empty() {
        bail!("Manifest {} declares no stacks", path.display());
    }
    Ok(set)
}

/// Plan every stack and apply an optional target filter
pub fn plan_stacks(
    set: &mut StackSet,
    jobs: usize,
    target: Option<&str>,
) -> Result<Vec<ExecutionPlan>> {
    let plans = set.plan_all(jobs)?;
    Ok(plans
        .into_iter()
        .map(|plan| plan.filter_by_target(target))
        .filter(|plan| target.is_none() || !plan.is_empty())
        .collect())
}
