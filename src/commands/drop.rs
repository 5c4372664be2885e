//! `pgconverge drop` - remove one database

use anyhow::Result;
use dialoguer::Confirm;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, name: &str, force: bool, yes: bool) -> Result<()> {
    let config = super::load_config(ctx)?;
    let (mut ledger, ledger_path) = super::load_ledger(ctx)?;

    if let Some((key, _)) = config.find(name) {
        ui::warn(&format!(
            "{name} is still configured as databases.{key}; the next apply will recreate it"
        ));
    }

    if !yes {
        let prompt = if force {
            format!("Drop database {name}, terminating its sessions?")
        } else {
            format!("Drop database {name}?")
        };
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        if !confirmed {
            ui::info("Aborted");
            return Ok(());
        }
    }

    let lifecycle = super::connect(ctx, &config.connection)?;
    lifecycle.delete_with(name, force)?;

    if ledger.forget_identity(name) {
        ledger.save(&ledger_path)?;
    }
    ui::success(&format!("Dropped database {name}"));
    Ok(())
}
