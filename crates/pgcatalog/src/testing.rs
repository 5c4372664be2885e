//! In-memory connection for unit tests
//!
//! Applies statements by their [`Action`] rather than parsing SQL, and
//! answers the reader's and the owner grant's catalog queries.

use crate::connection::{Connection, Row, Value};
use crate::error::StoreError;
use crate::identity::MEMBERSHIP_QUERY;
use crate::model::ObservedDatabase;
use crate::reader::{
    ALLOW_CONNECTIONS_QUERY, ATTRIBUTES_QUERY, EXISTS_QUERY, IS_TEMPLATE_QUERY, OWNER_QUERY,
};
use crate::reconcile::normalize_encoding;
use crate::statement::{Action, Param, Setting, Statement};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// A converged database as the catalog would report it
pub(crate) fn observed(name: &str, owner: &str) -> ObservedDatabase {
    ObservedDatabase {
        name: name.to_string(),
        owner: owner.to_string(),
        encoding: "UTF8".to_string(),
        collation: "C".to_string(),
        ctype: "C".to_string(),
        tablespace: "pg_default".to_string(),
        connection_limit: -1,
        allow_connections: Some(true),
        is_template: Some(false),
    }
}

#[derive(Default)]
struct Catalog {
    databases: BTreeMap<String, ObservedDatabase>,
    memberships: BTreeSet<(String, String)>,
    failures: Vec<(String, StoreError)>,
    executed: Vec<Statement>,
    queries: Vec<String>,
}

impl Catalog {
    fn failure(&self, sql: &str) -> Option<StoreError> {
        self.failures
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, err)| err.clone())
    }

    fn database_mut(&mut self, name: &str) -> Result<&mut ObservedDatabase, StoreError> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| does_not_exist(name))
    }

    fn apply(&mut self, statement: &Statement) -> Result<(), StoreError> {
        let target = statement.target.as_str();
        match &statement.action {
            Action::Create(options) => {
                if self.databases.contains_key(target) {
                    return Err(already_exists(target));
                }
                let text = |setting: &Option<Setting>, fallback: &str| match setting {
                    Some(Setting::Value(v)) => v.clone(),
                    _ => fallback.to_string(),
                };
                let database = ObservedDatabase {
                    name: target.to_string(),
                    owner: options.owner.clone(),
                    encoding: normalize_encoding(&text(&options.encoding, "UTF8")),
                    collation: text(&options.collation, "C"),
                    ctype: text(&options.ctype, "C"),
                    tablespace: text(&options.tablespace, "pg_default"),
                    connection_limit: options.connection_limit,
                    allow_connections: Some(options.allow_connections.unwrap_or(true)),
                    is_template: Some(options.is_template.unwrap_or(false)),
                };
                self.databases.insert(target.to_string(), database);
            }
            Action::Rename { to } => {
                if self.databases.contains_key(to) {
                    return Err(already_exists(to));
                }
                let mut database = self
                    .databases
                    .remove(target)
                    .ok_or_else(|| does_not_exist(target))?;
                database.name = to.clone();
                self.databases.insert(to.clone(), database);
            }
            Action::SetOwner { owner } => self.database_mut(target)?.owner = owner.clone(),
            Action::SetTablespace(tablespace) => {
                self.database_mut(target)?.tablespace = tablespace
                    .clone()
                    .unwrap_or_else(|| "pg_default".to_string());
            }
            Action::SetConnectionLimit(limit) => {
                self.database_mut(target)?.connection_limit = *limit;
            }
            Action::SetAllowConnections(allow) => {
                self.database_mut(target)?.allow_connections = Some(*allow);
            }
            Action::SetIsTemplate(is_template) => {
                self.database_mut(target)?.is_template = Some(*is_template);
            }
            Action::Drop { .. } => {
                if self.database_mut(target)?.is_template == Some(true) {
                    return Err(StoreError::new(
                        Some("42809"),
                        "cannot drop a template database",
                    ));
                }
                self.databases.remove(target);
            }
            Action::Grant { role, member } => {
                self.memberships.insert((role.clone(), member.clone()));
            }
            Action::Revoke { role, member } => {
                self.memberships.remove(&(role.clone(), member.clone()));
            }
        }
        Ok(())
    }

    fn answer(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, StoreError> {
        let text = |idx: usize| match params.get(idx) {
            Some(Param::Text(v)) => Ok(v.as_str()),
            other => Err(StoreError::client(format!(
                "parameter {idx}: expected text, got {other:?}"
            ))),
        };

        if sql == MEMBERSHIP_QUERY {
            let key = (text(0)?.to_string(), text(1)?.to_string());
            return Ok(if self.memberships.contains(&key) {
                vec![Row(vec![Value::Int(1)])]
            } else {
                Vec::new()
            });
        }

        let Some(db) = self.databases.get(text(0)?) else {
            return Ok(Vec::new());
        };
        let text_value = |s: &str| Value::Text(s.to_string());
        let flag = |v: Option<bool>| v.map_or(Value::Null, Value::Bool);
        let row = match sql {
            OWNER_QUERY => vec![text_value(&db.name), text_value(&db.owner)],
            ATTRIBUTES_QUERY => vec![
                text_value(&db.encoding),
                text_value(&db.collation),
                text_value(&db.ctype),
                text_value(&db.tablespace),
                Value::Int(db.connection_limit.into()),
            ],
            ALLOW_CONNECTIONS_QUERY => vec![flag(db.allow_connections)],
            IS_TEMPLATE_QUERY => vec![flag(db.is_template)],
            EXISTS_QUERY => vec![text_value(&db.name)],
            other => return Err(StoreError::client(format!("unexpected query: {other}"))),
        };
        Ok(vec![Row(row)])
    }
}

fn does_not_exist(name: &str) -> StoreError {
    StoreError::new(Some("3D000"), format!("database \"{name}\" does not exist"))
}

fn already_exists(name: &str) -> StoreError {
    StoreError::new(Some("42P04"), format!("database \"{name}\" already exists"))
}

/// A server that lives in a mutex
pub(crate) struct FakeConnection {
    version: String,
    catalog: Mutex<Catalog>,
}

impl FakeConnection {
    pub(crate) fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            catalog: Mutex::new(Catalog::default()),
        }
    }

    pub(crate) fn with_database(self, database: ObservedDatabase) -> Self {
        self.lock().databases.insert(database.name.clone(), database);
        self
    }

    pub(crate) fn with_membership(self, role: &str, member: &str) -> Self {
        self.lock()
            .memberships
            .insert((role.to_string(), member.to_string()));
        self
    }

    /// Fail every statement or query whose SQL contains `pattern`
    pub(crate) fn fail_on(self, pattern: &str, err: StoreError) -> Self {
        self.lock().failures.push((pattern.to_string(), err));
        self
    }

    /// Statements that ran successfully, in order
    pub(crate) fn executed(&self) -> Vec<Statement> {
        self.lock().executed.clone()
    }

    /// SQL text of every query run, in order
    pub(crate) fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    pub(crate) fn database(&self, name: &str) -> Option<ObservedDatabase> {
        self.lock().databases.get(name).cloned()
    }

    pub(crate) fn is_member(&self, role: &str, member: &str) -> bool {
        self.lock()
            .memberships
            .contains(&(role.to_string(), member.to_string()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Catalog> {
        self.catalog
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Connection for FakeConnection {
    fn server_version(&self) -> &str {
        &self.version
    }

    fn execute(&self, statement: &Statement) -> Result<u64, StoreError> {
        let mut catalog = self.lock();
        if let Some(err) = catalog.failure(&statement.sql) {
            return Err(err);
        }
        catalog.apply(statement)?;
        catalog.executed.push(statement.clone());
        Ok(0)
    }

    fn query(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, StoreError> {
        let mut catalog = self.lock();
        catalog.queries.push(sql.to_string());
        if let Some(err) = catalog.failure(sql) {
            return Err(err);
        }
        catalog.answer(sql, params)
    }
}
