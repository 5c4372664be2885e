//! Execution planner - config + ledger to resources

use crate::config::Config;
use crate::state::Ledger;
use declarative::{ExecutionPlan, Lifecycle, Managed, Retired};
use pgcatalog::DatabaseSpec;
use std::sync::Arc;

/// Build one resource per configured database, plus one per retired ledger
/// entry when pruning
pub fn build_plan<L>(
    config: &Config,
    ledger: &Ledger,
    lifecycle: &Arc<L>,
    prune: bool,
) -> ExecutionPlan
where
    L: Lifecycle<Desired = DatabaseSpec> + 'static,
{
    let mut plan = ExecutionPlan::new();

    for (key, spec) in &config.databases {
        let identity = ledger.identity(key).map(str::to_string);
        if let Some(recorded) = &identity
            && recorded != &spec.name
        {
            log::debug!("{key}: recorded as {recorded}, configured as {}", spec.name);
        }
        plan.add_resource(Box::new(Managed::new(
            key.as_str(),
            identity,
            spec.clone(),
            Arc::clone(lifecycle),
        )));
    }

    if prune {
        for (key, identity) in retired(config, ledger) {
            plan.add_resource(Box::new(Retired::new(key, identity, Arc::clone(lifecycle))));
        }
    }

    plan
}

/// Ledger entries whose key is no longer configured
pub fn retired<'a>(config: &'a Config, ledger: &'a Ledger) -> Vec<(&'a str, &'a str)> {
    ledger.retired(config.databases.keys().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Preview, Resource};
    use std::collections::BTreeSet;
    use std::fmt;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Unreachable;

    impl fmt::Display for Unreachable {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("unreachable")
        }
    }

    impl std::error::Error for Unreachable {}

    /// Knows only which names exist
    #[derive(Default)]
    struct Names(Mutex<BTreeSet<String>>);

    impl Lifecycle for Names {
        type Desired = DatabaseSpec;
        type Resolved = String;
        type Error = Unreachable;

        fn category(&self) -> &'static str {
            "database"
        }

        fn desired_identity(&self, desired: &DatabaseSpec) -> String {
            desired.name.clone()
        }

        fn create(&self, desired: &DatabaseSpec) -> Result<String, Unreachable> {
            self.0.lock().unwrap().insert(desired.name.clone());
            Ok(desired.name.clone())
        }

        fn read(&self, identity: &str) -> Result<Option<String>, Unreachable> {
            Ok(self.0.lock().unwrap().get(identity).cloned())
        }

        fn update(&self, identity: &str, desired: &DatabaseSpec) -> Result<String, Unreachable> {
            let mut names = self.0.lock().unwrap();
            names.remove(identity);
            names.insert(desired.name.clone());
            Ok(desired.name.clone())
        }

        fn delete(&self, identity: &str) -> Result<(), Unreachable> {
            self.0.lock().unwrap().remove(identity);
            Ok(())
        }

        fn exists(&self, identity: &str) -> Result<bool, Unreachable> {
            Ok(self.0.lock().unwrap().contains(identity))
        }

        fn preview(
            &self,
            identity: Option<&str>,
            desired: &DatabaseSpec,
        ) -> Result<Preview, Unreachable> {
            let mut preview = Preview::default();
            if identity != Some(desired.name.as_str()) {
                preview.statements.push(format!("converge {}", desired.name));
            }
            Ok(preview)
        }
    }

    fn config(entries: &[(&str, &str)]) -> Config {
        let mut config = Config::default();
        for (key, name) in entries {
            config
                .databases
                .insert((*key).to_string(), DatabaseSpec::new(*name));
        }
        config
    }

    #[test]
    fn test_one_resource_per_entry() {
        let config = config(&[("main", "app_db"), ("reports", "reports")]);
        let plan = build_plan(&config, &Ledger::default(), &Arc::new(Names::default()), false);
        let ids: Vec<String> = plan.resources.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["main", "reports"]);
    }

    #[test]
    fn test_ledger_identity_drives_rename() {
        let names = Arc::new(Names::default());
        names.0.lock().unwrap().insert("old_name".to_string());
        let mut ledger = Ledger::default();
        ledger.record("main", "old_name");

        let plan = build_plan(&config(&[("main", "new_name")]), &ledger, &names, false);
        let diff = plan.resources[0].diff().unwrap().unwrap();
        assert!(diff.is_modification());
    }

    #[test]
    fn test_prune_adds_retired_entries() {
        let names = Arc::new(Names::default());
        names.0.lock().unwrap().insert("legacy".to_string());
        let mut ledger = Ledger::default();
        ledger.record("old", "legacy");

        let config = config(&[("main", "app_db")]);
        assert_eq!(build_plan(&config, &ledger, &names, false).total_resources(), 1);

        let plan = build_plan(&config, &ledger, &names, true);
        assert_eq!(plan.total_resources(), 2);
        let diff = plan.resources[1].diff().unwrap().unwrap();
        assert!(diff.is_removal());
        assert_eq!(retired(&config, &ledger), vec![("old", "legacy")]);
    }
}
