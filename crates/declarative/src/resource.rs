//! Resource trait for declarative state management
//!
//! A Resource is one configured object instance that a host wants converged:
//! it can describe how the live object differs from its configuration and
//! apply whatever is needed to close that gap.

use crate::context::ApplyContext;
use crate::diff::ResourceDiff;
use crate::types::ApplyResult;
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Implementations are usually thin: [`crate::Managed`] and
/// [`crate::Retired`] adapt any [`crate::Lifecycle`] into a resource, so a
/// new object category only has to implement the lifecycle contract.
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique, stable identifier for this resource
    ///
    /// This is the host's configuration key, which survives renames of the
    /// underlying object.
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category (e.g., "database")
    ///
    /// Used for grouping and filtering.
    fn resource_type(&self) -> &'static str;

    /// Compare live state against desired state
    ///
    /// Returns `None` when the resource is already converged.
    fn diff(&self) -> Result<Option<ResourceDiff>>;

    /// Apply changes to reach the desired state
    ///
    /// This method should:
    /// 1. Respect ctx.dry_run (return Skipped if true)
    /// 2. Return NoChange when already converged
    /// 3. Make the necessary changes and report the resulting identity
    fn apply(&self, ctx: &ApplyContext) -> Result<ApplyResult>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;
