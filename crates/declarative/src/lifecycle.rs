//! The lifecycle contract and its resource adapters
//!
//! [`Lifecycle`] is the narrow interface an orchestration host drives:
//! Create, Read, Update, Delete and Exists keyed by the object's identity.
//! Nothing here knows about any particular store.

use crate::context::ApplyContext;
use crate::diff::{AttributeChange, ResourceDiff};
use crate::resource::Resource;
use crate::types::{ApplyResult, ResourceState};
use anyhow::{Context, Result};
use log::info;
use std::fmt;
use std::sync::Arc;

/// What converging a resource would do, without doing it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preview {
    /// Attributes that differ
    pub changes: Vec<AttributeChange>,
    /// Statements that would run, in order
    pub statements: Vec<String>,
}

impl Preview {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.statements.is_empty()
    }
}

/// Create/Read/Update/Delete/Exists for one object category
pub trait Lifecycle: Send + Sync {
    /// Desired attribute set, supplied by the host
    type Desired: fmt::Debug + Send + Sync;
    /// Attribute set read back from the store
    type Resolved: fmt::Debug + Send + Sync;
    /// Failure type of the backing store
    type Error: std::error::Error + Send + Sync + 'static;

    /// Category name (e.g., "database")
    fn category(&self) -> &'static str;

    /// The identity a desired attribute set will have once converged
    fn desired_identity(&self, desired: &Self::Desired) -> String;

    /// Create the object and return its resolved state
    fn create(&self, desired: &Self::Desired) -> Result<Self::Resolved, Self::Error>;

    /// Read the object; `None` means it is absent and the host should forget it
    fn read(&self, identity: &str) -> Result<Option<Self::Resolved>, Self::Error>;

    /// Converge an existing object and return its resolved state
    fn update(
        &self,
        identity: &str,
        desired: &Self::Desired,
    ) -> Result<Self::Resolved, Self::Error>;

    /// Remove the object
    fn delete(&self, identity: &str) -> Result<(), Self::Error>;

    /// Lightweight existence probe
    fn exists(&self, identity: &str) -> Result<bool, Self::Error>;

    /// Describe what `create` (identity `None`) or `update` would do
    fn preview(
        &self,
        identity: Option<&str>,
        desired: &Self::Desired,
    ) -> Result<Preview, Self::Error>;
}

/// A configured object that should exist
///
/// `identity` is what the host last recorded for this key. When it differs
/// from the desired identity the object is renamed rather than recreated.
pub struct Managed<L: Lifecycle> {
    key: String,
    identity: Option<String>,
    desired: L::Desired,
    lifecycle: Arc<L>,
}

impl<L: Lifecycle> Managed<L> {
    pub fn new(
        key: impl Into<String>,
        identity: Option<String>,
        desired: L::Desired,
        lifecycle: Arc<L>,
    ) -> Self {
        Self {
            key: key.into(),
            identity,
            desired,
            lifecycle,
        }
    }

    /// Find the live object this resource refers to, if any
    ///
    /// The recorded identity wins; otherwise an object already carrying the
    /// desired identity is adopted.
    fn resolve_identity(&self) -> Result<Option<String>> {
        if let Some(identity) = &self.identity
            && self.lifecycle.exists(identity)?
        {
            return Ok(Some(identity.clone()));
        }

        let desired = self.lifecycle.desired_identity(&self.desired);
        if self.identity.as_deref() != Some(desired.as_str()) && self.lifecycle.exists(&desired)? {
            return Ok(Some(desired));
        }

        Ok(None)
    }
}

impl<L: Lifecycle> fmt::Debug for Managed<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Managed")
            .field("key", &self.key)
            .field("identity", &self.identity)
            .field("desired", &self.desired)
            .finish_non_exhaustive()
    }
}

impl<L: Lifecycle> Resource for Managed<L> {
    fn id(&self) -> String {
        self.key.clone()
    }

    fn description(&self) -> String {
        format!(
            "{} {}",
            self.lifecycle.category(),
            self.lifecycle.desired_identity(&self.desired)
        )
    }

    fn resource_type(&self) -> &'static str {
        self.lifecycle.category()
    }

    fn diff(&self) -> Result<Option<ResourceDiff>> {
        let target = self.lifecycle.desired_identity(&self.desired);
        let identity = self.resolve_identity()?;
        let preview = self
            .lifecycle
            .preview(identity.as_deref(), &self.desired)
            .with_context(|| format!("planning {}", self.description()))?;

        let current = match &identity {
            None => ResourceState::Absent,
            Some(_) if preview.is_empty() => return Ok(None),
            Some(id) => ResourceState::Modified {
                from: id.clone(),
                to: target.clone(),
            },
        };

        Ok(Some(ResourceDiff {
            resource_id: self.id(),
            resource_type: self.resource_type().to_string(),
            description: self.description(),
            current,
            desired: ResourceState::Present {
                details: Some(target),
            },
            changes: preview.changes,
            statements: preview.statements,
        }))
    }

    fn apply(&self, ctx: &ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        let target = self.lifecycle.desired_identity(&self.desired);
        match self.resolve_identity()? {
            None => {
                self.lifecycle
                    .create(&self.desired)
                    .with_context(|| format!("creating {}", self.description()))?;
                info!("{}: created {target}", self.key);
                Ok(ApplyResult::Created { identity: target })
            }
            Some(identity) => {
                let preview = self
                    .lifecycle
                    .preview(Some(&identity), &self.desired)
                    .with_context(|| format!("planning {}", self.description()))?;
                if preview.is_empty() {
                    return Ok(ApplyResult::NoChange);
                }
                self.lifecycle
                    .update(&identity, &self.desired)
                    .with_context(|| format!("updating {}", self.description()))?;
                info!("{}: updated {identity} -> {target}", self.key);
                Ok(ApplyResult::Modified { identity: target })
            }
        }
    }
}

/// A recorded object whose configuration was removed and which should go
pub struct Retired<L: Lifecycle> {
    key: String,
    identity: String,
    lifecycle: Arc<L>,
}

impl<L: Lifecycle> Retired<L> {
    pub fn new(key: impl Into<String>, identity: impl Into<String>, lifecycle: Arc<L>) -> Self {
        Self {
            key: key.into(),
            identity: identity.into(),
            lifecycle,
        }
    }
}

impl<L: Lifecycle> fmt::Debug for Retired<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retired")
            .field("key", &self.key)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl<L: Lifecycle> Resource for Retired<L> {
    fn id(&self) -> String {
        self.key.clone()
    }

    fn description(&self) -> String {
        format!("{} {}", self.lifecycle.category(), self.identity)
    }

    fn resource_type(&self) -> &'static str {
        self.lifecycle.category()
    }

    fn diff(&self) -> Result<Option<ResourceDiff>> {
        if !self.lifecycle.exists(&self.identity)? {
            return Ok(None);
        }
        Ok(Some(ResourceDiff {
            resource_id: self.id(),
            resource_type: self.resource_type().to_string(),
            description: self.description(),
            current: ResourceState::Present {
                details: Some(self.identity.clone()),
            },
            desired: ResourceState::Absent,
            changes: Vec::new(),
            statements: Vec::new(),
        }))
    }

    fn apply(&self, ctx: &ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }
        self.lifecycle
            .delete(&self.identity)
            .with_context(|| format!("deleting {}", self.description()))?;
        info!("{}: deleted {}", self.key, self.identity);
        Ok(ApplyResult::Removed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Thing {
        pub name: String,
        pub size: u32,
    }

    #[derive(Debug)]
    pub(crate) struct Missing(pub String);

    impl fmt::Display for Missing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{} not found", self.0)
        }
    }

    impl std::error::Error for Missing {}

    /// In-memory lifecycle used to exercise the adapters
    #[derive(Debug, Default)]
    pub(crate) struct MemoryLifecycle {
        pub things: Mutex<BTreeMap<String, u32>>,
    }

    impl MemoryLifecycle {
        pub(crate) fn with(things: &[(&str, u32)]) -> Self {
            let map = things.iter().map(|(n, s)| ((*n).to_string(), *s)).collect();
            Self {
                things: Mutex::new(map),
            }
        }
    }

    impl Lifecycle for MemoryLifecycle {
        type Desired = Thing;
        type Resolved = Thing;
        type Error = Missing;

        fn category(&self) -> &'static str {
            "thing"
        }

        fn desired_identity(&self, desired: &Thing) -> String {
            desired.name.clone()
        }

        fn create(&self, desired: &Thing) -> Result<Thing, Missing> {
            self.things
                .lock()
                .unwrap()
                .insert(desired.name.clone(), desired.size);
            Ok(desired.clone())
        }

        fn read(&self, identity: &str) -> Result<Option<Thing>, Missing> {
            Ok(self.things.lock().unwrap().get(identity).map(|size| Thing {
                name: identity.to_string(),
                size: *size,
            }))
        }

        fn update(&self, identity: &str, desired: &Thing) -> Result<Thing, Missing> {
            let mut things = self.things.lock().unwrap();
            things
                .remove(identity)
                .ok_or_else(|| Missing(identity.to_string()))?;
            things.insert(desired.name.clone(), desired.size);
            Ok(desired.clone())
        }

        fn delete(&self, identity: &str) -> Result<(), Missing> {
            self.things.lock().unwrap().remove(identity);
            Ok(())
        }

        fn exists(&self, identity: &str) -> Result<bool, Missing> {
            Ok(self.things.lock().unwrap().contains_key(identity))
        }

        fn preview(&self, identity: Option<&str>, desired: &Thing) -> Result<Preview, Missing> {
            let current = identity.and_then(|id| self.read(id).ok().flatten());
            let mut changes = Vec::new();
            match current {
                None => changes.push(AttributeChange::new("name", None, desired.name.clone())),
                Some(current) => {
                    if current.name != desired.name {
                        changes.push(AttributeChange::new(
                            "name",
                            Some(current.name),
                            desired.name.clone(),
                        ));
                    }
                    if current.size != desired.size {
                        changes.push(AttributeChange::new(
                            "size",
                            Some(current.size.to_string()),
                            desired.size.to_string(),
                        ));
                    }
                }
            }
            Ok(Preview {
                changes,
                statements: Vec::new(),
            })
        }
    }

    fn thing(name: &str, size: u32) -> Thing {
        Thing {
            name: name.into(),
            size,
        }
    }

    #[test]
    fn test_managed_creates_when_absent() {
        let lifecycle = Arc::new(MemoryLifecycle::default());
        let resource = Managed::new("k", None, thing("a", 1), Arc::clone(&lifecycle));

        let diff = resource.diff().unwrap().unwrap();
        assert!(diff.is_addition());

        let result = resource.apply(&ApplyContext::new(false, false)).unwrap();
        assert_eq!(
            result,
            ApplyResult::Created {
                identity: "a".into()
            }
        );
        assert!(lifecycle.exists("a").unwrap());
    }

    #[test]
    fn test_managed_converged_has_no_diff() {
        let lifecycle = Arc::new(MemoryLifecycle::with(&[("a", 1)]));
        let resource = Managed::new("k", Some("a".into()), thing("a", 1), lifecycle);

        assert!(resource.diff().unwrap().is_none());
        assert_eq!(
            resource.apply(&ApplyContext::new(false, false)).unwrap(),
            ApplyResult::NoChange
        );
    }

    #[test]
    fn test_managed_renames_recorded_identity() {
        let lifecycle = Arc::new(MemoryLifecycle::with(&[("old", 1)]));
        let resource = Managed::new("k", Some("old".into()), thing("new", 1), Arc::clone(&lifecycle));

        let diff = resource.diff().unwrap().unwrap();
        assert!(diff.is_modification());
        assert_eq!(diff.changes[0].attribute, "name");

        let result = resource.apply(&ApplyContext::new(false, false)).unwrap();
        assert_eq!(result.identity(), Some("new"));
        assert!(!lifecycle.exists("old").unwrap());
        assert!(lifecycle.exists("new").unwrap());
    }

    #[test]
    fn test_managed_adopts_existing_object() {
        let lifecycle = Arc::new(MemoryLifecycle::with(&[("a", 1)]));
        let resource = Managed::new("k", Some("gone".into()), thing("a", 2), lifecycle);

        let result = resource.apply(&ApplyContext::new(false, false)).unwrap();
        assert_eq!(
            result,
            ApplyResult::Modified {
                identity: "a".into()
            }
        );
    }

    #[test]
    fn test_managed_dry_run_skips() {
        let lifecycle = Arc::new(MemoryLifecycle::default());
        let resource = Managed::new("k", None, thing("a", 1), Arc::clone(&lifecycle));

        let result = resource.apply(&ApplyContext::new(true, false)).unwrap();
        assert!(matches!(result, ApplyResult::Skipped { .. }));
        assert!(!lifecycle.exists("a").unwrap());
    }

    #[test]
    fn test_retired_deletes() {
        let lifecycle = Arc::new(MemoryLifecycle::with(&[("a", 1)]));
        let resource = Retired::new("k", "a", Arc::clone(&lifecycle));

        assert!(resource.diff().unwrap().unwrap().is_removal());
        assert_eq!(
            resource.apply(&ApplyContext::new(false, false)).unwrap(),
            ApplyResult::Removed
        );
        assert!(resource.diff().unwrap().is_none());
    }
}
