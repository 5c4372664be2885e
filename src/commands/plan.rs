//! `pgconverge plan` - show what apply would change

use anyhow::Result;
use declarative::compute_diffs;

use crate::Context;
use crate::engine::{build_plan, differ};
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>, prune: bool) -> Result<()> {
    let config = super::load_config(ctx)?;
    let (ledger, _) = super::load_ledger(ctx)?;
    if config.databases.is_empty() && !prune {
        ui::info("No databases configured");
        return Ok(());
    }

    let lifecycle = super::connect(ctx, &config.connection)?;
    let plan = build_plan(&config, &ledger, &lifecycle, prune).filter_by_target(target);
    if plan.is_empty() {
        ui::warn(&format!(
            "Nothing matches target {}",
            target.unwrap_or("(all)")
        ));
        return Ok(());
    }

    let diffs = compute_diffs(&plan.resources);
    differ::display_diffs(&diffs, ctx.verbose > 0);

    if !prune {
        super::apply::warn_retired(&config, &ledger);
    }
    Ok(())
}
