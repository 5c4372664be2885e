//! Execution engine for pgconverge
//!
//! The engine orchestrates:
//! 1. Planning - Build resources from the config and the identity ledger
//! 2. Diffing - Show per-attribute changes and the statements they need
//! 3. Executing - Apply changes on a worker pool, with confirmation

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ApplyOptions, execute};
pub use planner::build_plan;
