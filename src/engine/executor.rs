//! Execution engine - pgconverge executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyResult, AutoConfirm, ConfirmCallback, ExecuteOptions, ExecuteReport, ExecuteSummary,
    ExecutionPlan, compute_diffs,
};

use super::differ::display_diffs;
use crate::progress::ApplyProgress;

/// Options for an apply run (adds `yes` and `quiet` to the library options)
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
    /// Suppress the progress bar
    pub quiet: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
            verbose: false,
            quiet: false,
        }
    }
}

/// Interactive confirmation through dialoguer
struct PromptConfirm;

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

/// Show the plan, confirm, and apply it
pub fn execute(plan: ExecutionPlan, opts: &ApplyOptions) -> Result<ExecuteReport> {
    let diffs = compute_diffs(&plan.resources);
    display_diffs(&diffs, opts.verbose);

    if diffs.is_empty() {
        return Ok(ExecuteReport::default());
    }

    let lib_opts = ExecuteOptions {
        dry_run: opts.dry_run,
        jobs: opts.jobs.max(1),
        verbose: opts.verbose,
    };
    let mut progress = ApplyProgress::new(opts.quiet);

    println!();
    let report = if opts.yes || opts.dry_run {
        declarative::execute(plan, lib_opts, &mut progress, &mut AutoConfirm)?
    } else {
        declarative::execute(plan, lib_opts, &mut progress, &mut PromptConfirm)?
    };

    if opts.dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(report);
    }

    if report.summary.total_changes() == 0
        && report.summary.failed == 0
        && report.summary.skipped > 0
    {
        println!("  {} Aborted", "✗".red());
        return Ok(report);
    }

    print_summary(&report.summary);
    print_failures(&report);

    Ok(report)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Databases converged successfully!", "✓".green().bold());
    } else {
        println!("  {} Databases converged with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} databases created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} databases modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} databases dropped", summary.removed);
    }
    if summary.no_change > 0 {
        println!("    • {} databases already converged", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} databases skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "databases".red());
    }
}

fn print_failures(report: &ExecuteReport) {
    for outcome in &report.outcomes {
        if let ApplyResult::Failed { error } = &outcome.result {
            println!("    {} {}: {}", "✗".red(), outcome.id.bold(), error);
        }
    }
}
