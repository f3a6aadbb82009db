//! Site index → partition handle cache
//!
//! Entries are append-only: once a handle is cached for a site it is never
//! replaced, so callers may hold on to a resolved handle for the lifetime of
//! the owning distributed tensor. The lock only ever guards a single map
//! read or insert; lookups against the directory happen outside it.

use super::partition::PartitionHandle;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct AddressCache {
    entries: Mutex<BTreeMap<usize, PartitionHandle>>,
}

/// Outcome of [`AddressCache::insert_if_absent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// The offered handle was stored
    Inserted(PartitionHandle),
    /// Another caller got there first; its handle is returned
    Existing(PartitionHandle),
}

impl Insert {
    pub fn handle(self) -> PartitionHandle {
        match self {
            Insert::Inserted(h) | Insert::Existing(h) => h,
        }
    }
}

impl AddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section is a single map operation, so a poisoned lock
    // still guards a consistent map.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<usize, PartitionHandle>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, site: usize) -> Option<PartitionHandle> {
        self.lock().get(&site).copied()
    }

    /// Store `handle` for `site` unless an entry already exists
    pub fn insert_if_absent(&self, site: usize, handle: PartitionHandle) -> Insert {
        let mut entries = self.lock();
        match entries.get(&site) {
            Some(existing) => Insert::Existing(*existing),
            None => {
                entries.insert(site, handle);
                Insert::Inserted(handle)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
