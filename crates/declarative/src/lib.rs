//! # Declarative
//!
//! A framework for declarative resource lifecycles.
//!
//! This crate provides the host-side abstractions for declaring desired
//! state, comparing it with what a store reports, and converging the two.
//! It knows nothing about any particular store: object categories plug in by
//! implementing [`Lifecycle`].
//!
//! ## Core Concepts
//!
//! - **Lifecycle**: Create/Read/Update/Delete/Exists for one object category
//! - **CategoryLock**: Writers exclusive, readers shared, per category
//! - **Resource**: One configured instance a host wants converged
//! - **ExecutionPlan**: The resources for one run
//! - **Executor**: Applies resources on a worker pool
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecuteOptions, ExecutionPlan, Managed, execute_simple};
//! use std::sync::Arc;
//!
//! let lifecycle = Arc::new(MyLifecycle::connect()?);
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource(Box::new(Managed::new(
//!     "app",
//!     None,
//!     desired_app_state(),
//!     Arc::clone(&lifecycle),
//! )));
//!
//! let report = execute_simple(plan, ExecuteOptions::default())?;
//! assert!(report.summary.is_success());
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod lifecycle;
pub mod lock;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{AttributeChange, DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use executor::{execute, execute_simple};
pub use lifecycle::{Lifecycle, Managed, Preview, Retired};
pub use lock::{CategoryLock, ExclusiveGuard, SharedGuard};
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Resource};
pub use types::{
    ApplyResult, ExecuteOptions, ExecuteReport, ExecuteSummary, ResourceOutcome, ResourceState,
};
