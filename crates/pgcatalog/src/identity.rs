//! Scoped owner elevation
//!
//! A role that is not a superuser may only create a database for, or hand a
//! database to, a role it is a member of. [`ensure_owner_grant`] grants that
//! membership for the duration of one operation and the returned
//! [`OwnerGrant`] takes it away again, on every exit path.

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::statement::{Param, Statement};
use log::{debug, warn};

/// Direct membership of the acting role in the owner role
pub(crate) const MEMBERSHIP_QUERY: &str = "SELECT 1 FROM pg_catalog.pg_auth_members m \
     JOIN pg_catalog.pg_roles r ON r.oid = m.roleid \
     JOIN pg_catalog.pg_roles u ON u.oid = m.member \
     WHERE r.rolname = $1 AND u.rolname = $2";

/// Membership granted for one operation
///
/// Call [`OwnerGrant::finish`] (or [`OwnerGrant::release`]) to revoke and see
/// the result. A guard dropped without either still revokes, logging any
/// failure, so early returns and panics never leave the grant behind.
#[must_use = "dropping the guard revokes the grant immediately"]
pub struct OwnerGrant<'a> {
    conn: &'a dyn Connection,
    target: String,
    granted: Option<(String, String)>,
}

impl<'a> OwnerGrant<'a> {
    fn inert(conn: &'a dyn Connection, target: &str) -> Self {
        Self {
            conn,
            target: target.to_string(),
            granted: None,
        }
    }

    /// Whether this guard will revoke anything
    pub fn is_active(&self) -> bool {
        self.granted.is_some()
    }

    /// Revoke now and report the outcome
    pub fn release(mut self) -> Result<()> {
        self.revoke()
    }

    /// Revoke and combine with the guarded operation's outcome
    ///
    /// An operation error wins; a revoke failure is then only logged. After a
    /// successful operation a revoke failure becomes the result.
    pub fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.release()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(revoke_err) = self.release() {
                    warn!("{revoke_err}");
                }
                Err(err)
            }
        }
    }

    fn revoke(&mut self) -> Result<()> {
        let Some((role, member)) = self.granted.take() else {
            return Ok(());
        };
        let statement = Statement::revoke(&self.target, &role, &member);
        debug!("{statement}");
        self.conn
            .execute(&statement)
            .map(|_| ())
            .map_err(|e| {
                Error::store(&self.target, statement.attribute(), statement.intent(), e)
            })
    }
}

impl Drop for OwnerGrant<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.revoke() {
            warn!("best-effort revoke failed: {err}");
        }
    }
}

/// Make `acting` a member of `owner` until the returned guard is released
///
/// Nothing is granted when the owner is empty, is the acting role, or
/// already has the acting role as a direct member. A grant that races with
/// another session and finds the membership already present counts as
/// success.
pub fn ensure_owner_grant<'a>(
    conn: &'a dyn Connection,
    target: &str,
    owner: &str,
    acting: &str,
) -> Result<OwnerGrant<'a>> {
    if owner.is_empty() || owner == acting {
        return Ok(OwnerGrant::inert(conn, target));
    }

    let params = [Param::Text(owner.to_string()), Param::Text(acting.to_string())];
    let rows = conn
        .query(MEMBERSHIP_QUERY, &params)
        .map_err(|e| Error::store(target, "owner", "check owner membership", e))?;
    if !rows.is_empty() {
        debug!("{acting} is already a member of {owner}");
        return Ok(OwnerGrant::inert(conn, target));
    }

    let statement = Statement::grant(target, owner, acting);
    debug!("{statement}");
    match conn.execute(&statement) {
        Ok(_) => Ok(OwnerGrant {
            conn,
            target: target.to_string(),
            granted: Some((owner.to_string(), acting.to_string())),
        }),
        Err(e) if e.is_duplicate_membership() => {
            let conflict = Error::ConflictingGrant {
                role: owner.to_string(),
                member: acting.to_string(),
            };
            debug!("{conflict}");
            Ok(OwnerGrant::inert(conn, target))
        }
        Err(e) => Err(Error::store(
            target,
            statement.attribute(),
            statement.intent(),
            e,
        )),
    }
}
