//! Catalog state reader

use crate::capability::{CapabilitySet, Feature};
use crate::connection::{Connection, Row};
use crate::error::{Error, Result, StoreError};
use crate::model::ObservedDatabase;
use crate::statement::Param;
use log::debug;

pub(crate) const OWNER_QUERY: &str = "SELECT d.datname, pg_catalog.pg_get_userbyid(d.datdba) \
     FROM pg_catalog.pg_database d WHERE d.datname = $1";

pub(crate) const ATTRIBUTES_QUERY: &str = "SELECT pg_catalog.pg_encoding_to_char(d.encoding), \
     d.datcollate, d.datctype, t.spcname, d.datconnlimit \
     FROM pg_catalog.pg_database d \
     JOIN pg_catalog.pg_tablespace t ON t.oid = d.dattablespace \
     WHERE d.datname = $1";

pub(crate) const ALLOW_CONNECTIONS_QUERY: &str =
    "SELECT d.datallowconn FROM pg_catalog.pg_database d WHERE d.datname = $1";

pub(crate) const IS_TEMPLATE_QUERY: &str =
    "SELECT d.datistemplate FROM pg_catalog.pg_database d WHERE d.datname = $1";

pub(crate) const EXISTS_QUERY: &str =
    "SELECT d.datname FROM pg_catalog.pg_database d WHERE d.datname = $1";

fn single_row(
    conn: &dyn Connection,
    sql: &str,
    identity: &str,
    attribute: &'static str,
) -> Result<Option<Row>> {
    let params = [Param::Text(identity.to_string())];
    let rows = conn
        .query(sql, &params)
        .map_err(|e| Error::store(identity, attribute, "read", e))?;
    Ok(rows.into_iter().next())
}

fn read_flag(
    conn: &dyn Connection,
    sql: &str,
    identity: &str,
    attribute: &'static str,
) -> Result<Option<bool>> {
    let Some(row) = single_row(conn, sql, identity, attribute)? else {
        return Ok(None);
    };
    row.bool(0)
        .map(Some)
        .map_err(|e| Error::store(identity, attribute, "read", e))
}

fn decode<T>(
    identity: &str,
    attribute: &'static str,
    value: std::result::Result<T, StoreError>,
) -> Result<T> {
    value.map_err(|e| Error::store(identity, attribute, "read", e))
}

/// Read the current state of one database
///
/// `Ok(None)` means the database does not exist. Flags the server cannot
/// report stay `None`.
pub fn read_state(
    conn: &dyn Connection,
    caps: &CapabilitySet,
    identity: &str,
) -> Result<Option<ObservedDatabase>> {
    let Some(row) = single_row(conn, OWNER_QUERY, identity, "owner")? else {
        debug!("database {identity} not found");
        return Ok(None);
    };
    let name = decode(identity, "name", row.text(0))?.to_string();
    let owner = decode(identity, "owner", row.text(1))?.to_string();

    // The database may be dropped between the two queries.
    let Some(row) = single_row(conn, ATTRIBUTES_QUERY, identity, "attributes")? else {
        debug!("database {identity} disappeared while reading");
        return Ok(None);
    };

    let allow_connections = if caps.supports(Feature::DbAllowConnections) {
        read_flag(conn, ALLOW_CONNECTIONS_QUERY, identity, "allow_connections")?
    } else {
        None
    };
    let is_template = if caps.supports(Feature::DbIsTemplate) {
        read_flag(conn, IS_TEMPLATE_QUERY, identity, "is_template")?
    } else {
        None
    };

    Ok(Some(ObservedDatabase {
        name,
        owner,
        encoding: decode(identity, "encoding", row.text(0))?.to_string(),
        collation: decode(identity, "lc_collate", row.text(1))?.to_string(),
        ctype: decode(identity, "lc_ctype", row.text(2))?.to_string(),
        tablespace: decode(identity, "tablespace_name", row.text(3))?.to_string(),
        connection_limit: decode(identity, "connection_limit", row.int(4))?,
        allow_connections,
        is_template,
    }))
}

/// Whether a database with this name exists
pub fn exists(conn: &dyn Connection, identity: &str) -> Result<bool> {
    Ok(single_row(conn, EXISTS_QUERY, identity, "name")?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{observed, FakeConnection};

    #[test]
    fn test_read_absent() {
        let conn = FakeConnection::new("16.2");
        let caps = CapabilitySet::probe(conn.server_version()).unwrap();
        assert_eq!(read_state(&conn, &caps, "missing").unwrap(), None);
        assert!(!exists(&conn, "missing").unwrap());
    }

    #[test]
    fn test_read_present() {
        let conn = FakeConnection::new("16.2").with_database(observed("app_db", "app"));
        let caps = CapabilitySet::probe(conn.server_version()).unwrap();
        let state = read_state(&conn, &caps, "app_db").unwrap().unwrap();
        assert_eq!(state.owner, "app");
        assert_eq!(state.encoding, "UTF8");
        assert_eq!(state.tablespace, "pg_default");
        assert_eq!(state.allow_connections, Some(true));
        assert_eq!(state.is_template, Some(false));
        assert!(exists(&conn, "app_db").unwrap());
    }

    #[test]
    fn test_flags_skipped_without_capability() {
        let conn = FakeConnection::new("9.4.26").with_database(observed("legacy", "app"));
        let caps = CapabilitySet::probe(conn.server_version()).unwrap();
        let state = read_state(&conn, &caps, "legacy").unwrap().unwrap();
        assert_eq!(state.allow_connections, None);
        assert_eq!(state.is_template, None);
        assert!(
            conn.queries()
                .iter()
                .all(|q| q != ALLOW_CONNECTIONS_QUERY && q != IS_TEMPLATE_QUERY)
        );
    }

    #[test]
    fn test_query_failure_names_identity() {
        let conn = FakeConnection::new("16.2")
            .with_database(observed("app_db", "app"))
            .fail_on("pg_tablespace", StoreError::new(Some("42501"), "permission denied"));
        let caps = CapabilitySet::probe(conn.server_version()).unwrap();
        let err = read_state(&conn, &caps, "app_db").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
        assert!(err.to_string().contains("app_db"));
    }
}
