use anyhow::{Context, Result, bail};
use pgcatalog::{ConnectionConfig, DatabaseSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// The configuration file
///
/// ```toml
/// [connection]
/// host = "db.internal"
/// username = "admin"
///
/// [databases.main]
/// name = "app_db"
/// owner = "app_role"
/// connection_limit = 50
/// ```
///
/// Table keys under `databases` are stable handles: renaming `name` while
/// keeping the key renames the database instead of creating a new one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseSpec>,
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!(
            "Loaded {} database(s) from {}",
            config.databases.len(),
            path.display()
        );
        Ok(config)
    }

    /// Check every entry and reject two keys claiming the same database
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for (key, spec) in &self.databases {
            spec.validate()
                .with_context(|| format!("databases.{key}"))?;
            if let Some(other) = seen.insert(spec.name.as_str(), key.as_str()) {
                bail!(
                    "databases.{other} and databases.{key} both declare database {:?}",
                    spec.name
                );
            }
        }
        Ok(())
    }

    /// Find the entry for a key or database name
    pub fn find(&self, key_or_name: &str) -> Option<(&str, &DatabaseSpec)> {
        self.databases
            .get_key_value(key_or_name)
            .or_else(|| {
                self.databases
                    .iter()
                    .find(|(_, spec)| spec.name == key_or_name)
            })
            .map(|(key, spec)| (key.as_str(), spec))
    }
}
