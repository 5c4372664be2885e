//! Path resolution for pgconverge
//!
//! # Path Resolution Priority
//!
//! For the config file:
//! 1. `--config` / `PGCONVERGE_CONFIG`
//! 2. `XDG_CONFIG_HOME/pgconverge/config.toml` (if set)
//! 3. `~/.config/pgconverge/config.toml`
//!
//! For the identity ledger:
//! 1. `--state` / `PGCONVERGE_STATE`
//! 2. `XDG_STATE_HOME/pgconverge/state.toml` (if set)
//! 3. `~/.local/state/pgconverge/state.toml`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "pgconverge";

/// Get the pgconverge config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join(APP_DIR))
}

/// Get the pgconverge state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".local").join("state").join(APP_DIR))
}

/// The config file to use, honouring an explicit override
pub fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand_path(path)),
        None => Ok(config_dir()?.join("config.toml")),
    }
}

/// The ledger file to use, honouring an explicit override
pub fn state_file(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand_path(path)),
        None => Ok(state_dir()?.join("state.toml")),
    }
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => expand(s),
        None => path.to_path_buf(),
    }
}
