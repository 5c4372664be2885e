//! Category-scoped catalog lock
//!
//! Mutating lifecycle operations on one object category are mutually
//! exclusive; reads share the lock but never overlap a write. The lock is an
//! explicit value (typically a `static` beside the lifecycle implementation),
//! and every acquisition returns a guard so release happens on all exit paths.

use log::trace;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A reader/writer lock named after the object category it protects
#[derive(Debug)]
pub struct CategoryLock {
    category: &'static str,
    inner: RwLock<()>,
}

impl CategoryLock {
    /// Create a lock for a category (e.g., "database")
    pub const fn new(category: &'static str) -> Self {
        Self {
            category,
            inner: RwLock::new(()),
        }
    }

    /// The category this lock protects
    pub fn category(&self) -> &'static str {
        self.category
    }

    /// Acquire for Create/Update/Delete
    ///
    /// The lock guards no data, so a panic in a previous holder leaves nothing
    /// inconsistent and poisoning is ignored.
    pub fn exclusive(&self) -> ExclusiveGuard<'_> {
        trace!("acquiring exclusive {} lock", self.category);
        let guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        ExclusiveGuard {
            category: self.category,
            _guard: guard,
        }
    }

    /// Acquire for Read/Exists
    pub fn shared(&self) -> SharedGuard<'_> {
        trace!("acquiring shared {} lock", self.category);
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        SharedGuard {
            category: self.category,
            _guard: guard,
        }
    }
}

/// Held for the duration of a mutating operation
pub struct ExclusiveGuard<'a> {
    category: &'static str,
    _guard: RwLockWriteGuard<'a, ()>,
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        trace!("released exclusive {} lock", self.category);
    }
}

/// Held for the duration of a read-only operation
pub struct SharedGuard<'a> {
    category: &'static str,
    _guard: RwLockReadGuard<'a, ()>,
}

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        trace!("released shared {} lock", self.category);
    }
}
