//! Savepoints and rollback over a persisted collection.
//!
//! A [`VersionedCollection`] owns its store and a stack of full snapshots.
//! Savepoints are numbered from 1 in creation order; rolling back to `k`
//! restores snapshot `k` and forgets every snapshot after it, so the next
//! [`snapshot`](VersionedCollection::snapshot) is number `k + 1`.

use std::ops::{Deref, DerefMut};

use tracing::info;

use crate::error::{Error, Result};

/// A store whose whole contents can be captured and written back.
pub trait Versioned {
    /// Owned copy of the contents. Must not share anything with the live store.
    type State: Clone;

    fn capture(&self) -> Result<Self::State>;

    /// Replace the live contents with `state`.
    fn restore(&mut self, state: &Self::State) -> Result<()>;
}

pub struct VersionedCollection<S: Versioned> {
    inner: S,
    savepoints: Vec<S::State>,
}

impl<S: Versioned> VersionedCollection<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            savepoints: Vec::new(),
        }
    }

    /// Capture the live contents; returns the new savepoint's number.
    pub fn snapshot(&mut self) -> Result<usize> {
        let state = self.inner.capture()?;
        self.savepoints.push(state);

        let index = self.savepoints.len();
        info!(savepoint = index, "Savepoint created");
        Ok(index)
    }

    /// Restore savepoint `index` (1-based) and discard the newer ones.
    ///
    /// Nothing changes when `index` is out of range or the store refuses
    /// the restore.
    pub fn rollback(&mut self, index: i64) -> Result<()> {
        let len = self.savepoints.len();
        let position = usize::try_from(index)
            .ok()
            .filter(|&i| (1..=len).contains(&i))
            .ok_or(Error::OutOfRange { index, len })?;

        self.inner.restore(&self.savepoints[position - 1])?;
        self.savepoints.truncate(position);

        info!(savepoint = position, discarded = len - position, "Rolled back");
        Ok(())
    }

    pub fn savepoint_count(&self) -> usize {
        self.savepoints.len()
    }

    /// Savepoint `index` (1-based), if it exists
    pub fn savepoint(&self, index: usize) -> Option<&S::State> {
        index.checked_sub(1).and_then(|i| self.savepoints.get(i))
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Versioned> Deref for VersionedCollection<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: Versioned> DerefMut for VersionedCollection<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}
