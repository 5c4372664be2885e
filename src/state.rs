use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::{ApplyResult, ExecuteReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// State Structures
// ============================================================================

/// Identity ledger: what each configured key last converged to
///
/// The database name is the only identity the server knows. Keeping the
/// name each key was last applied under is what lets a changed `name` be
/// recognised as a rename.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Ledger {
    #[serde(default)]
    pub databases: BTreeMap<String, LedgerEntry>,

    /// Last time the ledger was updated
    pub last_updated: DateTime<Utc>,
}

/// One recorded database
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Database name at the last successful apply
    pub identity: String,

    pub last_applied: DateTime<Utc>,
}

// ============================================================================
// Ledger Implementation
// ============================================================================

impl Ledger {
    /// Load the ledger, or return an empty one if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using empty ledger");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let ledger: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(ledger)
    }

    /// Save the ledger, creating its directory if needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create state directory: {}", dir.display())
            })?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Identity recorded for a key
    pub fn identity(&self, key: &str) -> Option<&str> {
        self.databases.get(key).map(|e| e.identity.as_str())
    }

    /// Record the identity a key converged to
    pub fn record(&mut self, key: &str, identity: &str) {
        let now = Utc::now();
        self.databases.insert(
            key.to_string(),
            LedgerEntry {
                identity: identity.to_string(),
                last_applied: now,
            },
        );
        self.last_updated = now;
    }

    /// Forget a key whose database is gone
    pub fn forget(&mut self, key: &str) -> bool {
        let removed = self.databases.remove(key).is_some();
        if removed {
            self.last_updated = Utc::now();
        }
        removed
    }

    /// Forget whichever key recorded this identity
    pub fn forget_identity(&mut self, identity: &str) -> bool {
        let key = self
            .databases
            .iter()
            .find(|(_, e)| e.identity == identity)
            .map(|(k, _)| k.clone());
        key.is_some_and(|k| self.forget(&k))
    }

    /// Recorded keys that the configuration no longer mentions
    pub fn retired<'a, I>(&'a self, configured: I) -> Vec<(&'a str, &'a str)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let configured: Vec<&str> = configured.into_iter().collect();
        self.databases
            .iter()
            .filter(|(key, _)| !configured.contains(&key.as_str()))
            .map(|(key, e)| (key.as_str(), e.identity.as_str()))
            .collect()
    }

    /// Fold an execution's outcomes into the ledger
    pub fn apply_report(&mut self, report: &ExecuteReport) {
        for outcome in &report.outcomes {
            match &outcome.result {
                ApplyResult::Created { identity } | ApplyResult::Modified { identity } => {
                    self.record(&outcome.id, identity);
                }
                ApplyResult::Removed => {
                    self.forget(&outcome.id);
                }
                _ => {}
            }
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            databases: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
