//! Desired and observed database state

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Connection limit meaning "unlimited"
pub const UNLIMITED_CONNECTIONS: i32 = -1;

fn default_connection_limit() -> i32 {
    UNLIMITED_CONNECTIONS
}

/// The database a configuration asks for
///
/// `None` means "not managed": the server default applies on create and the
/// attribute is left alone on update. `template`, `encoding`, `collation`
/// and `ctype` only take effect on create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSpec {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default, alias = "lc_collate")]
    pub collation: Option<String>,
    #[serde(default, alias = "lc_ctype")]
    pub ctype: Option<String>,
    #[serde(default, alias = "tablespace_name")]
    pub tablespace: Option<String>,
    #[serde(default = "default_connection_limit")]
    pub connection_limit: i32,
    #[serde(default)]
    pub allow_connections: Option<bool>,
    #[serde(default)]
    pub is_template: Option<bool>,
}

impl DatabaseSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            template: None,
            encoding: None,
            collation: None,
            ctype: None,
            tablespace: None,
            connection_limit: UNLIMITED_CONNECTIONS,
            allow_connections: None,
            is_template: None,
        }
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn ctype(mut self, ctype: impl Into<String>) -> Self {
        self.ctype = Some(ctype.into());
        self
    }

    pub fn tablespace(mut self, tablespace: impl Into<String>) -> Self {
        self.tablespace = Some(tablespace.into());
        self
    }

    pub fn connection_limit(mut self, limit: i32) -> Self {
        self.connection_limit = limit;
        self
    }

    pub fn allow_connections(mut self, allow: bool) -> Self {
        self.allow_connections = Some(allow);
        self
    }

    pub fn is_template(mut self, is_template: bool) -> Self {
        self.is_template = Some(is_template);
        self
    }

    /// Owner to manage, ignoring an empty string
    pub fn managed_owner(&self) -> Option<&str> {
        self.owner.as_deref().filter(|o| !o.is_empty())
    }

    /// Check values that are invalid regardless of server state
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::validation(
                &self.name,
                "name",
                "database name must not be empty",
            ));
        }
        let names = [
            ("name", Some(self.name.as_str())),
            ("owner", self.owner.as_deref()),
            ("template", self.template.as_deref()),
            ("encoding", self.encoding.as_deref()),
            ("lc_collate", self.collation.as_deref()),
            ("lc_ctype", self.ctype.as_deref()),
            ("tablespace_name", self.tablespace.as_deref()),
        ];
        for (attribute, value) in names {
            if value.is_some_and(|v| v.contains('\0')) {
                return Err(Error::validation(
                    &self.name,
                    attribute,
                    "must not contain a NUL character",
                ));
            }
        }
        if self.connection_limit < UNLIMITED_CONNECTIONS {
            return Err(Error::validation(
                &self.name,
                "connection_limit",
                format!(
                    "{} is below -1 (use -1 for unlimited)",
                    self.connection_limit
                ),
            ));
        }
        Ok(())
    }
}

/// A database as the catalog reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedDatabase {
    pub name: String,
    pub owner: String,
    pub encoding: String,
    pub collation: String,
    pub ctype: String,
    pub tablespace: String,
    pub connection_limit: i32,
    /// `None` when the server cannot report it
    pub allow_connections: Option<bool>,
    /// `None` when the server cannot report it
    pub is_template: Option<bool>,
}
