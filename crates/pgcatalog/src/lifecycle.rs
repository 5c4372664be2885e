//! The database lifecycle
//!
//! [`DatabaseLifecycle`] binds the reader, the reconciler and the owner grant
//! to the [`declarative::Lifecycle`] contract. Every operation holds the
//! process-wide database category lock for its whole duration: writes
//! exclusively, reads shared.

use crate::capability::CapabilitySet;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::identity::ensure_owner_grant;
use crate::model::{DatabaseSpec, ObservedDatabase};
use crate::reader;
use crate::reconcile::{plan_create, plan_delete, plan_update};
use crate::statement::{Action, Statement};
use declarative::{AttributeChange, CategoryLock, Lifecycle, Preview};
use log::{debug, info, warn};
use std::sync::Arc;

static DATABASES: CategoryLock = CategoryLock::new("databases");

/// Create/Read/Update/Delete/Exists for databases on one server
pub struct DatabaseLifecycle {
    conn: Arc<dyn Connection>,
    caps: Arc<CapabilitySet>,
    acting: String,
}

impl DatabaseLifecycle {
    /// Probe the server's capabilities and build a lifecycle acting as `acting`
    pub fn new(conn: Arc<dyn Connection>, acting: impl Into<String>) -> Result<Self> {
        let caps = CapabilitySet::probe(conn.server_version())?;
        debug!(
            "server {} supports: {:?}",
            caps.version(),
            caps.features()
                .filter(|(_, supported)| *supported)
                .map(|(f, _)| f)
                .collect::<Vec<_>>()
        );
        Ok(Self::with_capabilities(conn, Arc::new(caps), acting))
    }

    pub fn with_capabilities(
        conn: Arc<dyn Connection>,
        caps: Arc<CapabilitySet>,
        acting: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            caps,
            acting: acting.into(),
        }
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.caps
    }

    /// The role statements run as
    pub fn acting_role(&self) -> &str {
        &self.acting
    }

    fn run(&self, statement: &Statement) -> Result<()> {
        debug!("{statement}");
        self.conn
            .execute(statement)
            .map(|_| ())
            .map_err(|e| {
                Error::store(&statement.target, statement.attribute(), statement.intent(), e)
            })
    }

    fn read_back(&self, identity: &str) -> Result<ObservedDatabase> {
        reader::read_state(self.conn.as_ref(), &self.caps, identity)?.ok_or_else(|| {
            Error::NotFound {
                identity: identity.to_string(),
            }
        })
    }

    /// Remove a database, optionally terminating its sessions first
    ///
    /// Removing a database that does not exist succeeds.
    pub fn delete_with(&self, identity: &str, force: bool) -> Result<()> {
        let _lock = DATABASES.exclusive();
        let Some(observed) = reader::read_state(self.conn.as_ref(), &self.caps, identity)? else {
            warn!("database {identity} already absent, nothing to delete");
            return Ok(());
        };

        info!("deleting database {identity}");
        for statement in plan_delete(&observed, &self.caps, force)? {
            self.run(&statement)?;
        }
        Ok(())
    }
}

fn create_changes(desired: &DatabaseSpec, owner: &str) -> Vec<AttributeChange> {
    let mut changes = vec![
        AttributeChange::new("name", None, desired.name.as_str()),
        AttributeChange::new("owner", None, owner),
    ];
    let optional = [
        ("template", desired.template.clone()),
        ("encoding", desired.encoding.clone()),
        ("lc_collate", desired.collation.clone()),
        ("lc_ctype", desired.ctype.clone()),
        ("tablespace_name", desired.tablespace.clone()),
        ("allow_connections", desired.allow_connections.map(|v| v.to_string())),
        ("is_template", desired.is_template.map(|v| v.to_string())),
    ];
    changes.extend(
        optional
            .into_iter()
            .filter_map(|(attr, value)| value.map(|v| AttributeChange::new(attr, None, v))),
    );
    changes.push(AttributeChange::new(
        "connection_limit",
        None,
        desired.connection_limit.to_string(),
    ));
    changes
}

impl Lifecycle for DatabaseLifecycle {
    type Desired = DatabaseSpec;
    type Resolved = ObservedDatabase;
    type Error = Error;

    fn category(&self) -> &'static str {
        "database"
    }

    fn desired_identity(&self, desired: &DatabaseSpec) -> String {
        desired.name.clone()
    }

    fn create(&self, desired: &DatabaseSpec) -> Result<ObservedDatabase> {
        let _lock = DATABASES.exclusive();
        let statement = plan_create(desired, &self.caps, &self.acting)?;
        let owner = match &statement.action {
            Action::Create(options) => options.owner.clone(),
            _ => self.acting.clone(),
        };

        info!("creating database {} owned by {owner}", desired.name);
        let grant = ensure_owner_grant(self.conn.as_ref(), &desired.name, &owner, &self.acting)?;
        grant.finish(self.run(&statement))?;
        self.read_back(&desired.name)
    }

    fn read(&self, identity: &str) -> Result<Option<ObservedDatabase>> {
        let _lock = DATABASES.shared();
        let state = reader::read_state(self.conn.as_ref(), &self.caps, identity)?;
        if state.is_none() {
            warn!("database {identity} not found");
        }
        Ok(state)
    }

    fn update(&self, identity: &str, desired: &DatabaseSpec) -> Result<ObservedDatabase> {
        let _lock = DATABASES.exclusive();
        let observed = self.read_back(identity)?;
        let plan = plan_update(desired, &observed, &self.caps)?;
        if plan.is_empty() {
            debug!("database {identity} already converged");
            return Ok(observed);
        }

        info!(
            "updating database {identity}: {}",
            plan.changes
                .iter()
                .map(|c| c.attribute.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        for statement in &plan.statements {
            match &statement.action {
                Action::SetOwner { owner } => {
                    let grant = ensure_owner_grant(
                        self.conn.as_ref(),
                        &statement.target,
                        owner,
                        &self.acting,
                    )?;
                    grant.finish(self.run(statement))?;
                }
                _ => self.run(statement)?,
            }
        }
        self.read_back(&desired.name)
    }

    fn delete(&self, identity: &str) -> Result<()> {
        self.delete_with(identity, false)
    }

    fn exists(&self, identity: &str) -> Result<bool> {
        let _lock = DATABASES.shared();
        reader::exists(self.conn.as_ref(), identity)
    }

    fn preview(&self, identity: Option<&str>, desired: &DatabaseSpec) -> Result<Preview> {
        let observed = match identity {
            Some(identity) => {
                let _lock = DATABASES.shared();
                reader::read_state(self.conn.as_ref(), &self.caps, identity)?
            }
            None => None,
        };

        match observed {
            Some(observed) => {
                let plan = plan_update(desired, &observed, &self.caps)?;
                Ok(Preview {
                    statements: plan.statements.iter().map(ToString::to_string).collect(),
                    changes: plan.changes,
                })
            }
            None => {
                let statement = plan_create(desired, &self.caps, &self.acting)?;
                let owner = desired.managed_owner().unwrap_or(&self.acting);
                Ok(Preview {
                    changes: create_changes(desired, owner),
                    statements: vec![statement.to_string()],
                })
            }
        }
    }
}
