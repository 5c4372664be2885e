//! Execution engine - applies resources on a worker pool
//!
//! Resources are applied concurrently, the way an orchestration host calls
//! lifecycle operations from many workers. Any ordering a lifecycle needs
//! (e.g., a category lock) is the lifecycle's own business.

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diff::compute_diffs;
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteReport};
use anyhow::Result;
use rayon::prelude::*;
use std::sync::{Arc, Mutex, PoisonError};

/// Execute a plan with the given options and callbacks
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `opts` - Execution options (dry_run, jobs, verbose)
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
///
/// # Returns
/// Totals plus one outcome per applied resource
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let diffs = compute_diffs(&plan.resources);
    if diffs.is_empty() {
        return Ok(ExecuteReport::default());
    }

    if opts.dry_run {
        let mut report = ExecuteReport::default();
        for diff in diffs {
            report.push(
                diff.resource_id,
                ApplyResult::Skipped {
                    reason: "Dry run".to_string(),
                },
            );
        }
        return Ok(report);
    }

    if !confirm.confirm("Apply changes?")? {
        let mut report = ExecuteReport::default();
        for diff in diffs {
            report.push(
                diff.resource_id,
                ApplyResult::Skipped {
                    reason: "Declined".to_string(),
                },
            );
        }
        return Ok(report);
    }

    let pending: Vec<&dyn Resource> = plan
        .resources
        .iter()
        .map(|r| r.as_ref())
        .filter(|r| diffs.iter().any(|d| d.resource_id == r.id()))
        .collect();

    progress.on_batch_start(pending.len());
    let results = execute_batch(&pending, opts.jobs, opts.verbose)?;
    let mut report = ExecuteReport::default();
    for (id, result) in results {
        progress.on_resource_complete(&id, &result);
        report.push(id, result);
    }
    progress.on_batch_complete();

    Ok(report)
}

/// Execute a batch of resources
fn execute_batch(
    resources: &[&dyn Resource],
    jobs: usize,
    verbose: bool,
) -> Result<Vec<(String, ApplyResult)>> {
    if jobs <= 1 || resources.len() == 1 {
        return Ok(resources
            .iter()
            .map(|resource| (resource.id(), apply_resource(*resource, verbose)))
            .collect());
    }
    execute_parallel(resources, jobs, verbose)
}

/// Execute resources in parallel using rayon
fn execute_parallel(
    resources: &[&dyn Resource],
    jobs: usize,
    verbose: bool,
) -> Result<Vec<(String, ApplyResult)>> {
    let results: Arc<Mutex<Vec<(String, ApplyResult)>>> = Arc::new(Mutex::new(Vec::new()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    pool.install(|| {
        resources.par_iter().for_each(|resource| {
            let result = apply_resource(*resource, verbose);
            results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((resource.id(), result));
        });
    });

    let results = Arc::try_unwrap(results)
        .map_err(|_| anyhow::anyhow!("Failed to collect apply results"))?
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);

    Ok(results)
}

/// Apply a single resource
fn apply_resource(resource: &dyn Resource, verbose: bool) -> ApplyResult {
    let ctx = ApplyContext::new(false, verbose);

    match resource.apply(&ctx) {
        Ok(result) => result,
        Err(e) => ApplyResult::Failed {
            error: format!("{e:#}"),
        },
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::lifecycle::tests::{MemoryLifecycle, Thing};
    use crate::lifecycle::{Lifecycle, Managed};

    fn plan_for(lifecycle: &Arc<MemoryLifecycle>, things: &[(&str, u32)]) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        for (name, size) in things {
            plan.add_resource(Box::new(Managed::new(
                *name,
                Some((*name).to_string()),
                Thing {
                    name: (*name).to_string(),
                    size: *size,
                },
                Arc::clone(lifecycle),
            )));
        }
        plan
    }

    #[test]
    fn test_execute_empty_plan() {
        let report = execute_simple(ExecutionPlan::new(), ExecuteOptions::default()).unwrap();
        assert_eq!(report.summary.total(), 0);
    }

    #[test]
    fn test_execute_no_changes() {
        let lifecycle = Arc::new(MemoryLifecycle::with(&[("a", 1)]));
        let plan = plan_for(&lifecycle, &[("a", 1)]);

        let report = execute_simple(plan, ExecuteOptions::default()).unwrap();

        // No diff means no execution
        assert_eq!(report.summary.total(), 0);
    }

    #[test]
    fn test_execute_with_changes_in_parallel() {
        let lifecycle = Arc::new(MemoryLifecycle::with(&[("a", 1)]));
        let plan = plan_for(&lifecycle, &[("a", 2), ("b", 1), ("c", 1), ("d", 1)]);

        let report = execute(
            plan,
            ExecuteOptions {
                jobs: 4,
                ..Default::default()
            },
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(report.summary.created, 3);
        assert_eq!(report.summary.modified, 1);
        assert_eq!(report.outcomes.len(), 4);
        assert!(lifecycle.exists("d").unwrap());
    }

    #[test]
    fn test_execute_dry_run_changes_nothing() {
        let lifecycle = Arc::new(MemoryLifecycle::default());
        let plan = plan_for(&lifecycle, &[("a", 1)]);

        let report = execute(
            plan,
            ExecuteOptions {
                dry_run: true,
                ..Default::default()
            },
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(report.summary.skipped, 1);
        assert!(!lifecycle.exists("a").unwrap());
    }

    #[test]
    fn test_execute_declined() {
        let lifecycle = Arc::new(MemoryLifecycle::default());
        let plan = plan_for(&lifecycle, &[("a", 1)]);

        let report = execute(
            plan,
            ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(report.summary.skipped, 1);
        assert!(!lifecycle.exists("a").unwrap());
    }
}
