//! Command implementations

pub mod apply;
pub mod drop;
pub mod inspect;
pub mod plan;

use anyhow::{Context as AnyhowContext, Result};
use pgcatalog::{ConnectionConfig, DatabaseLifecycle, PgConnection};
use std::path::PathBuf;
use std::sync::Arc;

use crate::Context;
use crate::config::Config;
use crate::paths;
use crate::progress;
use crate::state::Ledger;

/// Load the config file
///
/// A missing file is only an error when it was named explicitly.
pub fn load_config(ctx: &Context) -> Result<Config> {
    let path = paths::config_file(ctx.config_path.as_deref())?;
    if !path.exists() && ctx.config_path.is_none() {
        log::info!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load(&path)
}

/// Load the identity ledger and the path to save it back to
pub fn load_ledger(ctx: &Context) -> Result<(Ledger, PathBuf)> {
    let path = paths::state_file(ctx.state_path.as_deref())?;
    let ledger = Ledger::load(&path)?;
    Ok((ledger, path))
}

/// Connect, probe the server, and build the database lifecycle
pub fn connect(ctx: &Context, config: &ConnectionConfig) -> Result<Arc<DatabaseLifecycle>> {
    let pb = (!ctx.quiet).then(|| {
        progress::spinner(&format!(
            "Connecting to {}:{}...",
            config.host, config.port
        ))
    });
    let conn = PgConnection::connect(config);
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let conn = conn.with_context(|| {
        format!(
            "Could not connect to {}:{}/{} as {}",
            config.host, config.port, config.database, config.username
        )
    })?;
    let acting = conn.current_user().to_string();
    let lifecycle = DatabaseLifecycle::new(Arc::new(conn), acting)
        .context("Could not determine server capabilities")?;
    Ok(Arc::new(lifecycle))
}
