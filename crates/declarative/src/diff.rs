//! Diff computation for resources

use crate::resource::Resource;
use crate::types::ResourceState;
use log::warn;
use serde::{Deserialize, Serialize};

/// One attribute that differs between observed and desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Attribute name (e.g., "owner", "connection_limit")
    pub attribute: String,
    /// Observed value, `None` when the object does not exist yet
    pub from: Option<String>,
    /// Desired value
    pub to: String,
}

impl AttributeChange {
    pub fn new(attribute: impl Into<String>, from: Option<String>, to: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            from,
            to: to.into(),
        }
    }
}

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
    /// Per-attribute changes
    pub changes: Vec<AttributeChange>,
    /// Statements that converging would run, in order
    pub statements: Vec<String>,
}

impl ResourceDiff {
    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Present { .. }, ResourceState::Absent)
        )
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Modified { .. }, _) | (_, ResourceState::Modified { .. })
        )
    }
}

/// Compute diffs for a list of resources
///
/// Returns only resources that have differences between current and desired
/// state. Resources whose state cannot be determined are reported with
/// `ResourceState::Unknown` so they are not silently dropped from a plan.
pub fn compute_diffs(resources: &[Box<dyn Resource>]) -> Vec<ResourceDiff> {
    resources
        .iter()
        .filter_map(|r| match r.diff() {
            Ok(diff) => diff,
            Err(e) => {
                warn!("could not determine state of {}: {e:#}", r.id());
                Some(ResourceDiff {
                    resource_id: r.id(),
                    resource_type: r.resource_type().to_string(),
                    description: r.description(),
                    current: ResourceState::Unknown,
                    desired: ResourceState::Unknown,
                    changes: vec![AttributeChange::new("error", None, format!("{e:#}"))],
                    statements: Vec::new(),
                })
            }
        })
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
    /// Number of resources whose state is unknown
    pub unknown: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else if diff.is_modification() {
                summary.modifications += 1;
            } else {
                summary.unknown += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(
    diffs: &[ResourceDiff],
) -> std::collections::BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: std::collections::BTreeMap<String, Vec<&ResourceDiff>> =
        std::collections::BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
