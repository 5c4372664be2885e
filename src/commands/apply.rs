//! `pgconverge apply` - converge the server to the configuration

use anyhow::{Result, bail};
use declarative::Lifecycle;
use pgcatalog::DatabaseLifecycle;

use crate::Context;
use crate::config::Config;
use crate::engine::{ApplyOptions, build_plan, execute, planner};
use crate::state::Ledger;
use crate::ui;

pub struct ApplyRequest<'a> {
    pub target: Option<&'a str>,
    pub dry_run: bool,
    pub jobs: usize,
    pub yes: bool,
    pub prune: bool,
}

pub fn run(ctx: &Context, req: ApplyRequest<'_>) -> Result<()> {
    let config = super::load_config(ctx)?;
    let (mut ledger, ledger_path) = super::load_ledger(ctx)?;
    if config.databases.is_empty() && !req.prune {
        ui::info("No databases configured");
        return Ok(());
    }

    let lifecycle = super::connect(ctx, &config.connection)?;
    let plan = build_plan(&config, &ledger, &lifecycle, req.prune).filter_by_target(req.target);
    if plan.is_empty() {
        ui::warn(&format!(
            "Nothing matches target {}",
            req.target.unwrap_or("(all)")
        ));
        return Ok(());
    }

    let opts = ApplyOptions {
        dry_run: req.dry_run,
        jobs: req.jobs,
        yes: req.yes,
        verbose: ctx.verbose > 0,
        quiet: ctx.quiet,
    };
    let report = execute(plan, &opts)?;

    if req.dry_run {
        return Ok(());
    }

    ledger.apply_report(&report);
    adopt_converged(&config, &mut ledger, &lifecycle)?;
    if req.prune {
        forget_vanished(&config, &mut ledger, &lifecycle)?;
    }
    ledger.save(&ledger_path)?;

    if !req.prune {
        warn_retired(&config, &ledger);
    }

    if !report.summary.is_success() {
        bail!("{} database(s) failed to converge", report.summary.failed);
    }
    Ok(())
}

/// Record configured databases that already matched and were never applied
///
/// Converged resources produce no outcome, so without this a database that
/// existed before its first apply would never gain a ledger entry and a later
/// rename would be planned as a create.
fn adopt_converged(
    config: &Config,
    ledger: &mut Ledger,
    lifecycle: &DatabaseLifecycle,
) -> Result<()> {
    for (key, spec) in &config.databases {
        if ledger.identity(key).is_some() {
            continue;
        }
        if lifecycle.exists(&spec.name)? {
            log::debug!("adopting existing database {} as {key}", spec.name);
            ledger.record(key, &spec.name);
        }
    }
    Ok(())
}

/// Drop retired ledger entries whose database is already gone
fn forget_vanished(
    config: &Config,
    ledger: &mut Ledger,
    lifecycle: &DatabaseLifecycle,
) -> Result<()> {
    let retired: Vec<(String, String)> = planner::retired(config, ledger)
        .into_iter()
        .map(|(key, identity)| (key.to_string(), identity.to_string()))
        .collect();
    for (key, identity) in retired {
        if !lifecycle.exists(&identity)? {
            log::debug!("forgetting {key}: {identity} no longer exists");
            ledger.forget(&key);
        }
    }
    Ok(())
}

/// Mention recorded databases that are no longer configured
pub fn warn_retired(config: &Config, ledger: &Ledger) {
    let retired = planner::retired(config, ledger);
    if retired.is_empty() {
        return;
    }
    println!();
    ui::warn(&format!(
        "{} recorded database(s) are no longer configured (use --prune to drop them):",
        retired.len()
    ));
    for (key, identity) in retired {
        ui::dim(&format!("{key} → {identity}"));
    }
}
