//! Connection collaborator
//!
//! The reconciler only needs three things from a connection: the server's
//! version string, a way to execute a [`Statement`] and a way to run a
//! catalog query. [`PgConnection`] provides them over a blocking
//! `postgres::Client`; tests provide them in memory.

use crate::error::StoreError;
use crate::statement::{Param, Statement};
use log::debug;
use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls, SimpleQueryMessage};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// What the reconciler needs from the server
pub trait Connection: Send + Sync {
    /// The server's reported `server_version`
    fn server_version(&self) -> &str;

    /// Execute one statement and return the number of rows affected
    fn execute(&self, statement: &Statement) -> Result<u64, StoreError>;

    /// Run a query and return all rows
    fn query(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, StoreError>;
}

/// A column value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

/// A result row, columns in select order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(pub Vec<Value>);

impl Row {
    fn column(&self, idx: usize) -> Result<&Value, StoreError> {
        self.0
            .get(idx)
            .ok_or_else(|| StoreError::client(format!("row has no column {idx}")))
    }

    pub fn text(&self, idx: usize) -> Result<&str, StoreError> {
        match self.column(idx)? {
            Value::Text(s) => Ok(s),
            other => Err(StoreError::client(format!(
                "column {idx}: expected text, got {other:?}"
            ))),
        }
    }

    pub fn int(&self, idx: usize) -> Result<i32, StoreError> {
        match self.column(idx)? {
            Value::Int(v) => i32::try_from(*v)
                .map_err(|_| StoreError::client(format!("column {idx}: {v} out of range"))),
            other => Err(StoreError::client(format!(
                "column {idx}: expected integer, got {other:?}"
            ))),
        }
    }

    pub fn bool(&self, idx: usize) -> Result<bool, StoreError> {
        match self.column(idx)? {
            Value::Bool(v) => Ok(*v),
            other => Err(StoreError::client(format!(
                "column {idx}: expected boolean, got {other:?}"
            ))),
        }
    }
}

/// Where and as whom to connect
///
/// Credentials are never stored: the password is read from the named
/// environment variable at connect time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub username: String,
    /// Maintenance database to connect to
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_password_env")]
    pub password_env: String,
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_user() -> String {
    "postgres".to_string()
}

fn default_database() -> String {
    "postgres".to_string()
}

fn default_password_env() -> String {
    "PGPASSWORD".to_string()
}

fn default_application_name() -> String {
    "pgconverge".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_user(),
            database: default_database(),
            password_env: default_password_env(),
            application_name: default_application_name(),
        }
    }
}

impl ConnectionConfig {
    fn to_postgres(&self) -> postgres::Config {
        let mut config = postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.username)
            .dbname(&self.database)
            .application_name(&self.application_name);
        if let Ok(password) = std::env::var(&self.password_env) {
            config.password(password);
        }
        config
    }
}

/// A blocking connection to one server
pub struct PgConnection {
    client: Mutex<Client>,
    server_version: String,
    current_user: String,
}

impl PgConnection {
    /// Connect and record the server version and acting role
    pub fn connect(config: &ConnectionConfig) -> Result<Self, StoreError> {
        debug!(
            "connecting to {}:{}/{} as {}",
            config.host, config.port, config.database, config.username
        );
        let mut client = config.to_postgres().connect(NoTls)?;
        let row = client.query_one("SELECT current_setting('server_version'), current_user", &[])?;
        let server_version: String = row.try_get(0)?;
        let current_user: String = row.try_get(1)?;
        debug!("connected to PostgreSQL {server_version} as {current_user}");

        Ok(Self {
            client: Mutex::new(client),
            server_version,
            current_user,
        })
    }

    /// The role statements run as
    pub fn current_user(&self) -> &str {
        &self.current_user
    }
}

impl Connection for PgConnection {
    fn server_version(&self) -> &str {
        &self.server_version
    }

    fn execute(&self, statement: &Statement) -> Result<u64, StoreError> {
        let sql = statement.bound_sql();
        debug!("executing: {sql}");
        let mut client = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        let messages = client.simple_query(&sql)?;
        Ok(messages
            .iter()
            .filter_map(|m| match m {
                SimpleQueryMessage::CommandComplete(n) => Some(*n),
                _ => None,
            })
            .sum())
    }

    fn query(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, StoreError> {
        debug!("querying: {sql}");
        let bound: Vec<&(dyn ToSql + Sync)> = params.iter().map(as_to_sql).collect();
        let mut client = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        client
            .query(sql, &bound)?
            .iter()
            .map(convert_row)
            .collect()
    }
}

fn as_to_sql(param: &Param) -> &(dyn ToSql + Sync) {
    match param {
        Param::Int(v) => v,
        Param::Bool(v) => v,
        Param::Text(v) => v,
    }
}

fn convert_row(row: &postgres::Row) -> Result<Row, StoreError> {
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = if *ty == Type::BOOL {
            row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool)
        } else if *ty == Type::INT2 {
            row.try_get::<_, Option<i16>>(idx)?
                .map(|v| Value::Int(v.into()))
        } else if *ty == Type::INT4 {
            row.try_get::<_, Option<i32>>(idx)?
                .map(|v| Value::Int(v.into()))
        } else if *ty == Type::INT8 {
            row.try_get::<_, Option<i64>>(idx)?.map(Value::Int)
        } else {
            row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
        };
        values.push(value.unwrap_or(Value::Null));
    }
    Ok(Row(values))
}
