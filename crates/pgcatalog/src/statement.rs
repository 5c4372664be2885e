//! Generated statements
//!
//! A [`Statement`] keeps the SQL text together with its typed parameters and
//! the structured [`Action`] it performs, so failures can name the attribute
//! being changed and plans can be shown before anything runs.

use crate::quote::{quote_identifier, quote_literal};
use serde::Serialize;
use std::fmt;

/// The zero-data template every server ships with
pub const ZERO_DATA_TEMPLATE: &str = "template0";

/// A typed statement parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Param {
    Int(i32),
    Bool(bool),
    Text(String),
}

impl Param {
    /// The parameter as SQL literal text
    pub fn to_sql_literal(&self) -> String {
        match self {
            Param::Int(v) => v.to_string(),
            Param::Bool(v) => v.to_string(),
            Param::Text(v) => quote_literal(v),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_literal())
    }
}

/// A create option that is either explicit or the dialect's `DEFAULT`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Setting {
    Default,
    Value(String),
}

impl Setting {
    /// Interpret a configured value, treating `DEFAULT` (any case) as the sentinel
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("DEFAULT") {
            Setting::Default
        } else {
            Setting::Value(value.to_string())
        }
    }
}

/// Which template a new database is copied from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Template {
    /// `template0`, whose locale and encoding may be overridden freely
    ZeroData,
    /// `TEMPLATE DEFAULT`
    Default,
    /// Any other named template
    Named(String),
}

impl Template {
    /// Interpret a configured template; unset means the zero-data template
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("") | Some(ZERO_DATA_TEMPLATE) => Template::ZeroData,
            Some(v) if v.eq_ignore_ascii_case("DEFAULT") => Template::Default,
            Some(v) => Template::Named(v.to_string()),
        }
    }

    /// Name recorded for the resolved state
    pub fn name(&self) -> &str {
        match self {
            Template::ZeroData => ZERO_DATA_TEMPLATE,
            Template::Default => "DEFAULT",
            Template::Named(name) => name,
        }
    }
}

/// Everything `CREATE DATABASE` sets, with defaults already applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateDatabase {
    pub owner: String,
    pub template: Template,
    pub encoding: Option<Setting>,
    pub collation: Option<Setting>,
    pub ctype: Option<Setting>,
    pub tablespace: Option<Setting>,
    pub allow_connections: Option<bool>,
    pub connection_limit: i32,
    pub is_template: Option<bool>,
}

impl CreateDatabase {
    fn render(&self, name: &str) -> String {
        let mut sql = format!(
            "CREATE DATABASE {} OWNER {}",
            quote_identifier(name),
            quote_identifier(&self.owner)
        );

        match &self.template {
            Template::ZeroData => sql.push_str(" TEMPLATE template0"),
            Template::Default => sql.push_str(" TEMPLATE DEFAULT"),
            Template::Named(t) => {
                sql.push_str(" TEMPLATE ");
                sql.push_str(&quote_identifier(t));
            }
        }

        for (clause, setting) in [
            ("ENCODING", &self.encoding),
            ("LC_COLLATE", &self.collation),
            ("LC_CTYPE", &self.ctype),
        ] {
            match setting {
                None => {}
                Some(Setting::Default) => sql.push_str(&format!(" {clause} DEFAULT")),
                Some(Setting::Value(v)) => sql.push_str(&format!(" {clause} {}", quote_literal(v))),
            }
        }

        match &self.tablespace {
            None => {}
            Some(Setting::Default) => sql.push_str(" TABLESPACE DEFAULT"),
            Some(Setting::Value(t)) => {
                sql.push_str(" TABLESPACE ");
                sql.push_str(&quote_identifier(t));
            }
        }

        if let Some(allow) = self.allow_connections {
            sql.push_str(&format!(" ALLOW_CONNECTIONS {allow}"));
        }
        sql.push_str(&format!(" CONNECTION LIMIT {}", self.connection_limit));
        if let Some(is_template) = self.is_template {
            sql.push_str(&format!(" IS_TEMPLATE {is_template}"));
        }
        sql
    }
}

/// What a statement does, in structured form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Action {
    Create(CreateDatabase),
    Rename { to: String },
    SetOwner { owner: String },
    /// `None` resets to the server default tablespace
    SetTablespace(Option<String>),
    SetConnectionLimit(i32),
    SetAllowConnections(bool),
    SetIsTemplate(bool),
    Drop { force: bool },
    Grant { role: String, member: String },
    Revoke { role: String, member: String },
}

impl Action {
    /// The attribute this action changes
    pub fn attribute(&self) -> &'static str {
        match self {
            Action::Create(_) | Action::Drop { .. } => "database",
            Action::Rename { .. } => "name",
            Action::SetOwner { .. } | Action::Grant { .. } | Action::Revoke { .. } => "owner",
            Action::SetTablespace(_) => "tablespace_name",
            Action::SetConnectionLimit(_) => "connection_limit",
            Action::SetAllowConnections(_) => "allow_connections",
            Action::SetIsTemplate(_) => "is_template",
        }
    }

    /// Short description used in error messages
    pub fn intent(&self) -> &'static str {
        match self {
            Action::Create(_) => "create",
            Action::Rename { .. } => "rename",
            Action::SetOwner { .. } => "change owner",
            Action::SetTablespace(_) => "change tablespace",
            Action::SetConnectionLimit(_) => "change connection limit",
            Action::SetAllowConnections(_) => "change ALLOW_CONNECTIONS",
            Action::SetIsTemplate(_) => "change IS_TEMPLATE",
            Action::Drop { .. } => "drop",
            Action::Grant { .. } => "grant owner membership",
            Action::Revoke { .. } => "revoke owner membership",
        }
    }
}

/// One SQL statement aimed at one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    /// Identity of the database the statement addresses
    pub target: String,
    pub action: Action,
    pub sql: String,
    pub params: Vec<Param>,
}

impl Statement {
    fn new(target: &str, action: Action, sql: String, params: Vec<Param>) -> Self {
        Self {
            target: target.to_string(),
            action,
            sql,
            params,
        }
    }

    pub fn create(name: &str, options: CreateDatabase) -> Self {
        let sql = options.render(name);
        Self::new(name, Action::Create(options), sql, Vec::new())
    }

    pub fn rename(from: &str, to: &str) -> Self {
        let sql = format!(
            "ALTER DATABASE {} RENAME TO {}",
            quote_identifier(from),
            quote_identifier(to)
        );
        Self::new(from, Action::Rename { to: to.to_string() }, sql, Vec::new())
    }

    pub fn set_owner(name: &str, owner: &str) -> Self {
        let sql = format!(
            "ALTER DATABASE {} OWNER TO {}",
            quote_identifier(name),
            quote_identifier(owner)
        );
        let action = Action::SetOwner {
            owner: owner.to_string(),
        };
        Self::new(name, action, sql, Vec::new())
    }

    pub fn set_tablespace(name: &str, tablespace: Option<&str>) -> Self {
        let sql = match tablespace {
            None => format!("ALTER DATABASE {} RESET TABLESPACE", quote_identifier(name)),
            Some(t) => format!(
                "ALTER DATABASE {} SET TABLESPACE {}",
                quote_identifier(name),
                quote_identifier(t)
            ),
        };
        let action = Action::SetTablespace(tablespace.map(str::to_string));
        Self::new(name, action, sql, Vec::new())
    }

    pub fn set_connection_limit(name: &str, limit: i32) -> Self {
        let sql = format!(
            "ALTER DATABASE {} CONNECTION LIMIT = $1",
            quote_identifier(name)
        );
        Self::new(
            name,
            Action::SetConnectionLimit(limit),
            sql,
            vec![Param::Int(limit)],
        )
    }

    pub fn set_allow_connections(name: &str, allow: bool) -> Self {
        let sql = format!(
            "ALTER DATABASE {} ALLOW_CONNECTIONS $1",
            quote_identifier(name)
        );
        Self::new(
            name,
            Action::SetAllowConnections(allow),
            sql,
            vec![Param::Bool(allow)],
        )
    }

    pub fn set_is_template(name: &str, is_template: bool) -> Self {
        let sql = format!("ALTER DATABASE {} IS_TEMPLATE $1", quote_identifier(name));
        Self::new(
            name,
            Action::SetIsTemplate(is_template),
            sql,
            vec![Param::Bool(is_template)],
        )
    }

    pub fn drop(name: &str, force: bool) -> Self {
        let mut sql = format!("DROP DATABASE {}", quote_identifier(name));
        if force {
            sql.push_str(" WITH (FORCE)");
        }
        Self::new(name, Action::Drop { force }, sql, Vec::new())
    }

    pub fn grant(target: &str, role: &str, member: &str) -> Self {
        let sql = format!(
            "GRANT {} TO {}",
            quote_identifier(role),
            quote_identifier(member)
        );
        let action = Action::Grant {
            role: role.to_string(),
            member: member.to_string(),
        };
        Self::new(target, action, sql, Vec::new())
    }

    pub fn revoke(target: &str, role: &str, member: &str) -> Self {
        let sql = format!(
            "REVOKE {} FROM {}",
            quote_identifier(role),
            quote_identifier(member)
        );
        let action = Action::Revoke {
            role: role.to_string(),
            member: member.to_string(),
        };
        Self::new(target, action, sql, Vec::new())
    }

    pub fn attribute(&self) -> &'static str {
        self.action.attribute()
    }

    pub fn intent(&self) -> &'static str {
        self.action.intent()
    }

    /// SQL with every `$n` placeholder replaced by its parameter's literal form
    ///
    /// Utility statements cannot take bind parameters, so this is what goes
    /// over the wire. Parameters are typed values, never user text. Only
    /// placeholders outside quoted identifiers and literals are bound.
    pub fn bound_sql(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut quote: Option<char> = None;
        let mut chars = self.sql.chars().peekable();

        while let Some(c) = chars.next() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                    out.push(c);
                }
                None if c == '"' || c == '\'' => {
                    quote = Some(c);
                    out.push(c);
                }
                None if c == '$' => {
                    let mut digits = String::new();
                    while let Some(&d) = chars.peek() {
                        if !d.is_ascii_digit() {
                            break;
                        }
                        digits.push(d);
                        chars.next();
                    }
                    let param = digits
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| self.params.get(i));
                    match param {
                        Some(param) => out.push_str(&param.to_sql_literal()),
                        None => {
                            out.push('$');
                            out.push_str(&digits);
                        }
                    }
                }
                None => out.push(c),
            }
        }
        out
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)?;
        for (i, param) in self.params.iter().enumerate() {
            write!(f, "  -- ${} = {param}", i + 1)?;
        }
        Ok(())
    }
}
