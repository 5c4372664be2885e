//! Desired vs. observed → ordered statements
//!
//! Planning is pure: nothing here talks to the server. Every check that can
//! fail runs before the first statement is produced, so a plan is either
//! complete or an error.

use crate::capability::{CapabilitySet, Feature};
use crate::error::{Error, Result};
use crate::model::{DatabaseSpec, ObservedDatabase};
use crate::statement::{CreateDatabase, Setting, Statement, Template};
use declarative::AttributeChange;

/// Encoding used when creating from the zero-data template without one
pub const DEFAULT_ENCODING: &str = "UTF8";

/// Locale used when creating from the zero-data template without one
pub const DEFAULT_LOCALE: &str = "C";

/// Tablespace the catalog reports for `DEFAULT`
pub const DEFAULT_TABLESPACE: &str = "pg_default";

/// Statements that converge an existing database, in execution order
#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    pub statements: Vec<Statement>,
    pub changes: Vec<AttributeChange>,
}

impl UpdatePlan {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    fn push(&mut self, change: AttributeChange, statement: Statement) {
        self.changes.push(change);
        self.statements.push(statement);
    }
}

fn check_capabilities(desired: &DatabaseSpec, caps: &CapabilitySet) -> Result<()> {
    if desired.allow_connections.is_some() {
        caps.require(Feature::DbAllowConnections)?;
    }
    if desired.is_template.is_some() {
        caps.require(Feature::DbIsTemplate)?;
    }
    Ok(())
}

/// Explicit value of a create-only setting, if any
fn explicit(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("DEFAULT"))
}

/// Canonical spelling of an encoding name
///
/// The server ignores case and anything that is not a letter or digit, and
/// knows a few names by alias, so `utf-8`, `Unicode` and `UTF8` are one
/// encoding.
pub(crate) fn normalize_encoding(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if let Some(code) = cleaned.strip_prefix("WINDOWS") {
        return format!("WIN{code}");
    }

    let latin: &'static str = match cleaned.as_str() {
        "UNICODE" => return "UTF8".to_string(),
        "ISO88591" => "1",
        "ISO88592" => "2",
        "ISO88593" => "3",
        "ISO88594" => "4",
        "ISO88599" => "5",
        "ISO885910" => "6",
        "ISO885913" => "7",
        "ISO885914" => "8",
        "ISO885915" => "9",
        "ISO885916" => "10",
        _ => "",
    };
    if latin.is_empty() {
        cleaned
    } else {
        format!("LATIN{latin}")
    }
}

fn check_create_only(desired: &DatabaseSpec, observed: &ObservedDatabase) -> Result<()> {
    let checks: [(&'static str, Option<&str>, &str, bool); 3] = [
        ("encoding", desired.encoding.as_deref(), &observed.encoding, true),
        ("lc_collate", desired.collation.as_deref(), &observed.collation, false),
        ("lc_ctype", desired.ctype.as_deref(), &observed.ctype, false),
    ];

    for (attribute, wanted, current, is_encoding) in checks {
        let Some(wanted) = explicit(wanted) else {
            continue;
        };
        let same = if is_encoding {
            normalize_encoding(wanted) == normalize_encoding(current)
        } else {
            wanted == current
        };
        if !same {
            return Err(Error::validation(
                &observed.name,
                attribute,
                format!("cannot change from {current:?} to {wanted:?} after creation"),
            ));
        }
    }
    Ok(())
}

fn setting(value: Option<&str>, fallback: Option<&str>) -> Option<Setting> {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => Some(Setting::parse(v)),
        None => fallback.map(|f| Setting::Value(f.to_string())),
    }
}

/// Plan the `CREATE DATABASE` for a desired state
///
/// The owner defaults to `acting`. Encoding and locale default to UTF8 and
/// C only when copying the zero-data template; other templates keep theirs.
pub fn plan_create(
    desired: &DatabaseSpec,
    caps: &CapabilitySet,
    acting: &str,
) -> Result<Statement> {
    desired.validate()?;
    check_capabilities(desired, caps)?;

    let template = Template::parse(desired.template.as_deref());
    let zero_data = template == Template::ZeroData;
    let encoding_default = zero_data.then_some(DEFAULT_ENCODING);
    let locale_default = zero_data.then_some(DEFAULT_LOCALE);

    let options = CreateDatabase {
        owner: desired.managed_owner().unwrap_or(acting).to_string(),
        template,
        encoding: setting(desired.encoding.as_deref(), encoding_default),
        collation: setting(desired.collation.as_deref(), locale_default),
        ctype: setting(desired.ctype.as_deref(), locale_default),
        tablespace: setting(desired.tablespace.as_deref(), None),
        allow_connections: caps
            .supports(Feature::DbAllowConnections)
            .then(|| desired.allow_connections.unwrap_or(true)),
        connection_limit: desired.connection_limit,
        is_template: caps
            .supports(Feature::DbIsTemplate)
            .then(|| desired.is_template.unwrap_or(false)),
    };

    Ok(Statement::create(&desired.name, options))
}

/// Plan the statements that converge `observed` to `desired`
///
/// Order is fixed: rename, owner, tablespace, connection limit,
/// allow-connections, is-template. Statements after a rename address the new
/// name. Attributes left `None` in `desired` are not managed.
pub fn plan_update(
    desired: &DatabaseSpec,
    observed: &ObservedDatabase,
    caps: &CapabilitySet,
) -> Result<UpdatePlan> {
    desired.validate()?;
    check_capabilities(desired, caps)?;
    check_create_only(desired, observed)?;

    let mut plan = UpdatePlan::default();
    let name = desired.name.as_str();

    if observed.name != name {
        plan.push(
            AttributeChange::new("name", Some(observed.name.clone()), name),
            Statement::rename(&observed.name, name),
        );
    }

    if let Some(owner) = desired.managed_owner()
        && owner != observed.owner
    {
        plan.push(
            AttributeChange::new("owner", Some(observed.owner.clone()), owner),
            Statement::set_owner(name, owner),
        );
    }

    if let Some(tablespace) = desired.tablespace.as_deref() {
        let reset = tablespace.is_empty() || tablespace.eq_ignore_ascii_case("DEFAULT");
        let target = if reset { DEFAULT_TABLESPACE } else { tablespace };
        if target != observed.tablespace {
            plan.push(
                AttributeChange::new(
                    "tablespace_name",
                    Some(observed.tablespace.clone()),
                    target,
                ),
                Statement::set_tablespace(name, (!reset).then_some(tablespace)),
            );
        }
    }

    if desired.connection_limit != observed.connection_limit {
        plan.push(
            AttributeChange::new(
                "connection_limit",
                Some(observed.connection_limit.to_string()),
                desired.connection_limit.to_string(),
            ),
            Statement::set_connection_limit(name, desired.connection_limit),
        );
    }

    if let Some(allow) = desired.allow_connections
        && observed.allow_connections != Some(allow)
    {
        plan.push(
            AttributeChange::new(
                "allow_connections",
                observed.allow_connections.map(|v| v.to_string()),
                allow.to_string(),
            ),
            Statement::set_allow_connections(name, allow),
        );
    }

    if let Some(is_template) = desired.is_template
        && observed.is_template != Some(is_template)
    {
        plan.push(
            AttributeChange::new(
                "is_template",
                observed.is_template.map(|v| v.to_string()),
                is_template.to_string(),
            ),
            Statement::set_is_template(name, is_template),
        );
    }

    Ok(plan)
}

/// Plan the statements that remove a database
///
/// A template database cannot be dropped, so the flag is cleared first.
pub fn plan_delete(
    observed: &ObservedDatabase,
    caps: &CapabilitySet,
    force: bool,
) -> Result<Vec<Statement>> {
    if force {
        caps.require(Feature::ForceDropDatabase)?;
    }

    let mut statements = Vec::with_capacity(2);
    if caps.supports(Feature::DbIsTemplate) && observed.is_template == Some(true) {
        statements.push(Statement::set_is_template(&observed.name, false));
    }
    statements.push(Statement::drop(&observed.name, force));
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::statement::{Action, Param};
    use crate::testing::observed;

    fn caps(version: &str) -> CapabilitySet {
        CapabilitySet::probe(version).unwrap()
    }

    #[test]
    fn test_create_app_db() {
        let desired = DatabaseSpec::new("app_db")
            .owner("app_role")
            .encoding("UTF8")
            .template("template0");
        let stmt = plan_create(&desired, &caps("16.2"), "postgres").unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE DATABASE \"app_db\" OWNER \"app_role\" TEMPLATE template0 \
             ENCODING 'UTF8' LC_COLLATE 'C' LC_CTYPE 'C' ALLOW_CONNECTIONS true \
             CONNECTION LIMIT -1 IS_TEMPLATE false"
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_create_defaults_owner_to_acting_role() {
        let stmt = plan_create(&DatabaseSpec::new("db"), &caps("16.2"), "admin").unwrap();
        assert!(stmt.sql.contains("OWNER \"admin\""), "{}", stmt.sql);
    }

    #[test]
    fn test_create_on_old_server_omits_gated_clauses() {
        let stmt = plan_create(&DatabaseSpec::new("db"), &caps("9.4.26"), "admin").unwrap();
        assert!(!stmt.sql.contains("ALLOW_CONNECTIONS"));
        assert!(!stmt.sql.contains("IS_TEMPLATE"));
        assert!(stmt.sql.contains("CONNECTION LIMIT -1"));
    }

    #[test]
    fn test_create_named_template_keeps_its_locale() {
        let desired = DatabaseSpec::new("db").template("template1").tablespace("fast");
        let stmt = plan_create(&desired, &caps("16.2"), "admin").unwrap();
        assert!(stmt.sql.contains("TEMPLATE \"template1\""));
        assert!(!stmt.sql.contains("ENCODING"));
        assert!(!stmt.sql.contains("LC_COLLATE"));
        assert!(stmt.sql.contains("TABLESPACE \"fast\""));
    }

    #[test]
    fn test_create_quotes_literals_and_identifiers() {
        let desired = DatabaseSpec::new("we\"ird").owner("o'brien").collation("it's");
        let stmt = plan_create(&desired, &caps("16.2"), "admin").unwrap();
        assert!(stmt.sql.contains("\"we\"\"ird\""));
        assert!(stmt.sql.contains("OWNER \"o'brien\""));
        assert!(stmt.sql.contains("LC_COLLATE 'it''s'"));
    }

    #[test]
    fn test_create_gated_attribute_fails() {
        let desired = DatabaseSpec::new("db").is_template(true);
        let err = plan_create(&desired, &caps("9.4.26"), "admin").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn test_create_rejects_bad_connection_limit() {
        let desired = DatabaseSpec::new("db").connection_limit(-5);
        let err = plan_create(&desired, &caps("16.2"), "admin").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_update_converged_is_empty() {
        let observed = observed("app_db", "app");
        let desired = DatabaseSpec::new("app_db")
            .owner("app")
            .encoding("utf8")
            .collation("C")
            .tablespace("DEFAULT")
            .allow_connections(true)
            .is_template(false);
        let plan = plan_update(&desired, &observed, &caps("16.2")).unwrap();
        assert!(plan.is_empty(), "{:?}", plan.statements);
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn test_update_connection_limit_only() {
        let observed = observed("app_db", "app");
        let desired = DatabaseSpec::new("app_db").owner("app").connection_limit(50);
        let plan = plan_update(&desired, &observed, &caps("16.2")).unwrap();
        assert_eq!(plan.statements.len(), 1);
        let stmt = &plan.statements[0];
        assert_eq!(stmt.sql, "ALTER DATABASE \"app_db\" CONNECTION LIMIT = $1");
        assert_eq!(stmt.params, vec![Param::Int(50)]);
        assert_eq!(plan.changes[0].from.as_deref(), Some("-1"));
        assert_eq!(plan.changes[0].to, "50");
    }

    #[test]
    fn test_update_rename_precedes_owner() {
        let observed = observed("old_db", "app");
        let desired = DatabaseSpec::new("new_db")
            .owner("other")
            .connection_limit(10)
            .is_template(true);
        let plan = plan_update(&desired, &observed, &caps("16.2")).unwrap();
        let attributes: Vec<_> = plan.statements.iter().map(|s| s.attribute()).collect();
        assert_eq!(
            attributes,
            vec!["name", "owner", "connection_limit", "is_template"]
        );
        assert_eq!(plan.statements[0].target, "old_db");
        assert!(plan.statements[1..].iter().all(|s| s.target == "new_db"));
        assert_eq!(
            plan.statements[1].action,
            Action::SetOwner {
                owner: "other".into()
            }
        );
    }

    #[test]
    fn test_update_tablespace_reset_and_set() {
        let mut current = observed("db", "app");
        current.tablespace = "fast".to_string();

        let plan = plan_update(&DatabaseSpec::new("db").tablespace(""), &current, &caps("16.2"))
            .unwrap();
        assert_eq!(plan.statements[0].sql, "ALTER DATABASE \"db\" RESET TABLESPACE");

        let plan = plan_update(
            &DatabaseSpec::new("db").tablespace("slow"),
            &current,
            &caps("16.2"),
        )
        .unwrap();
        assert_eq!(
            plan.statements[0].sql,
            "ALTER DATABASE \"db\" SET TABLESPACE \"slow\""
        );
    }

    #[test]
    fn test_update_unmanaged_attributes_ignored() {
        let mut current = observed("db", "someone");
        current.tablespace = "fast".to_string();
        current.allow_connections = Some(false);
        let plan = plan_update(&DatabaseSpec::new("db"), &current, &caps("16.2")).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_update_gated_attribute_emits_nothing() {
        let observed = observed("db", "app");
        let desired = DatabaseSpec::new("renamed").allow_connections(false);
        let err = plan_update(&desired, &observed, &caps("9.4.26")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn test_update_rejects_create_only_change() {
        let observed = observed("db", "app");
        let err = plan_update(
            &DatabaseSpec::new("db").collation("en_US.UTF-8"),
            &observed,
            &caps("16.2"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("lc_collate"));
    }

    #[test]
    fn test_delete_clears_template_first() {
        let mut current = observed("tmpl", "app");
        current.is_template = Some(true);
        let statements = plan_delete(&current, &caps("16.2"), false).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].action, Action::SetIsTemplate(false));
        assert_eq!(statements[1].sql, "DROP DATABASE \"tmpl\"");
    }

    #[test]
    fn test_delete_template_with_placeholder_in_name() {
        let mut current = observed("x$1", "app");
        current.is_template = Some(true);
        let statements = plan_delete(&current, &caps("16.2"), false).unwrap();
        let sql: Vec<String> = statements.iter().map(Statement::bound_sql).collect();
        assert_eq!(
            sql,
            vec![
                "ALTER DATABASE \"x$1\" IS_TEMPLATE false",
                "DROP DATABASE \"x$1\"",
            ]
        );
    }

    #[test]
    fn test_normalize_encoding() {
        assert_eq!(normalize_encoding("UTF8"), "UTF8");
        assert_eq!(normalize_encoding("utf-8"), "UTF8");
        assert_eq!(normalize_encoding("Unicode"), "UTF8");
        assert_eq!(normalize_encoding("ISO-8859-1"), "LATIN1");
        assert_eq!(normalize_encoding("iso_8859_15"), "LATIN9");
        assert_eq!(normalize_encoding("windows-1252"), "WIN1252");
        assert_eq!(normalize_encoding("SQL_ASCII"), "SQLASCII");
    }

    #[test]
    fn test_encoding_alias_is_not_drift() {
        let desired = DatabaseSpec::new("app_db").owner("app").encoding("UTF-8");
        let plan = plan_update(&desired, &observed("app_db", "app"), &caps("16.2")).unwrap();
        assert!(plan.is_empty());

        let desired = DatabaseSpec::new("app_db").owner("app").encoding("LATIN1");
        let err = plan_update(&desired, &observed("app_db", "app"), &caps("16.2")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_delete_plain() {
        let statements = plan_delete(&observed("db", "app"), &caps("16.2"), false).unwrap();
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_delete_force_requires_capability() {
        let current = observed("db", "app");
        let err = plan_delete(&current, &caps("12.9"), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);

        let statements = plan_delete(&current, &caps("13.0"), true).unwrap();
        assert_eq!(statements[0].sql, "DROP DATABASE \"db\" WITH (FORCE)");
    }
}
