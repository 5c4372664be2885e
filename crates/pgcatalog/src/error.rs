//! Error types for catalog reconciliation.
//!
//! Errors are categorized so the lifecycle can tell the two idempotent
//! conditions (an absent object on read, an existing membership on grant)
//! apart from failures that must reach the host.

use crate::capability::Feature;
use thiserror::Error;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The object does not exist
    NotFound,
    /// The server version lacks a feature the desired state needs
    UnsupportedFeature,
    /// The role membership being granted already exists
    ConflictingGrant,
    /// The desired state is invalid or asks for an impossible transition
    Validation,
    /// Any other failure reported by the server
    Store,
}

impl ErrorKind {
    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "The object is absent; it will be created on the next apply",
            Self::UnsupportedFeature => {
                "Upgrade the server or remove the attribute from the configuration"
            }
            Self::ConflictingGrant => "No action needed - membership already exists",
            Self::Validation => "Fix the configuration value and try again",
            Self::Store => "Check the server message for details",
        }
    }
}

/// A failure reported by the server or the client library.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StoreError {
    /// SQLSTATE, when the server sent one
    pub code: Option<String>,
    /// The server's message
    pub message: String,
}

impl StoreError {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Failure that did not come from the server
    pub fn client(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    /// Whether this reports a role membership that already exists
    ///
    /// Concurrent grants surface as a unique violation on
    /// `pg_auth_members`; some servers report the membership directly.
    pub fn is_duplicate_membership(&self) -> bool {
        self.code.as_deref() == Some("23505") || self.message.contains("is already a member")
    }
}

impl From<postgres::Error> for StoreError {
    fn from(err: postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db) => Self::new(Some(db.code().code()), db.message()),
            None => Self::client(err.to_string()),
        }
    }
}

/// Errors that can occur while reconciling a database.
///
/// Each variant carries the identity and attribute involved.
#[derive(Debug, Error)]
pub enum Error {
    /// The database does not exist
    #[error("database {identity:?} not found")]
    NotFound { identity: String },

    /// The server does not support a feature the desired state uses
    #[error("server version {version:?} does not support {feature}")]
    UnsupportedFeature { feature: Feature, version: String },

    /// The acting role is already a member of the owner role
    #[error("role {member:?} is already a member of role {role:?}")]
    ConflictingGrant { role: String, member: String },

    /// Invalid desired state
    #[error("invalid {attribute} for database {identity:?}: {message}")]
    Validation {
        identity: String,
        attribute: &'static str,
        message: String,
    },

    /// The server rejected a statement or query
    #[error("{intent} failed for database {identity:?} ({attribute}): {source}")]
    Store {
        identity: String,
        attribute: &'static str,
        intent: String,
        #[source]
        source: StoreError,
    },

    /// The server reported a version string that could not be parsed
    #[error("unrecognized server version {0:?}")]
    InvalidVersion(String),
}

impl Error {
    /// Get the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::UnsupportedFeature { .. } => ErrorKind::UnsupportedFeature,
            Error::ConflictingGrant { .. } => ErrorKind::ConflictingGrant,
            Error::Validation { .. } | Error::InvalidVersion(_) => ErrorKind::Validation,
            Error::Store { .. } => ErrorKind::Store,
        }
    }

    pub(crate) fn validation(
        identity: &str,
        attribute: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Error::Validation {
            identity: identity.to_string(),
            attribute,
            message: message.into(),
        }
    }

    pub(crate) fn store(
        identity: &str,
        attribute: &'static str,
        intent: impl Into<String>,
        source: StoreError,
    ) -> Self {
        Error::Store {
            identity: identity.to_string(),
            attribute,
            intent: intent.into(),
            source,
        }
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;
