//! Declarative reconciliation of PostgreSQL databases
//!
//! Given a desired [`DatabaseSpec`] and a live server, this crate works out
//! the DDL that makes the catalog match and runs it:
//!
//! - [`capability`] turns the server version into a [`CapabilitySet`]
//! - [`reader`] reads a database's current attributes from the catalog
//! - [`reconcile`] compares desired and observed state and plans statements
//! - [`identity`] grants the acting role membership in the owner role for
//!   the length of one operation
//! - [`lifecycle`] ties these together behind [`declarative::Lifecycle`]
//!
//! ```ignore
//! use pgcatalog::{ConnectionConfig, DatabaseLifecycle, DatabaseSpec, PgConnection};
//! use declarative::Lifecycle;
//! use std::sync::Arc;
//!
//! let conn = PgConnection::connect(&ConnectionConfig::default())?;
//! let acting = conn.current_user().to_string();
//! let lifecycle = DatabaseLifecycle::new(Arc::new(conn), acting)?;
//! lifecycle.create(&DatabaseSpec::new("app_db").owner("app_role"))?;
//! ```

pub mod capability;
pub mod connection;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod model;
pub mod quote;
pub mod reader;
pub mod reconcile;
pub mod statement;

#[cfg(test)]
pub(crate) mod testing;

pub use capability::{CapabilitySet, Feature, ServerVersion};
pub use connection::{Connection, ConnectionConfig, PgConnection, Row, Value};
pub use error::{Error, ErrorKind, Result, StoreError};
pub use identity::{OwnerGrant, ensure_owner_grant};
pub use lifecycle::DatabaseLifecycle;
pub use model::{DatabaseSpec, ObservedDatabase, UNLIMITED_CONNECTIONS};
pub use quote::{quote_identifier, quote_literal};
pub use reconcile::{UpdatePlan, plan_create, plan_delete, plan_update};
pub use statement::{Action, Param, Statement};
