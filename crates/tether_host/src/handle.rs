//! Host reference handles
//!
//! Two ownership forms, mirroring how a managed host hands out references:
//!
//! - [`LocalRef`] lives in a [`LocalScope`] and is freed when the scope
//!   drops. The `'s` borrow keeps it from being stored past the call that
//!   opened the scope.
//! - [`GlobalRef`] is promoted explicitly, may cross threads, and stays
//!   valid until released.

use crate::object::HostObject;
use dashmap::DashMap;
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Frame of scope-local references.
pub struct LocalScope {
    slots: RefCell<Vec<Option<Arc<HostObject>>>>,
}

impl LocalScope {
    pub(crate) fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
        }
    }

    pub fn create_local_reference(&self, object: Arc<HostObject>) -> LocalRef<'_> {
        let mut slots = self.slots.borrow_mut();
        slots.push(Some(object));
        LocalRef {
            scope: self,
            slot: slots.len() - 1,
        }
    }

    /// Free a local before the scope ends. Any copy of `local` reads as
    /// released afterwards.
    pub fn release(&self, local: LocalRef<'_>) {
        if let Some(slot) = self.slots.borrow_mut().get_mut(local.slot) {
            *slot = None;
        }
    }

    /// Number of locals that have not been released yet.
    pub fn live_count(&self) -> usize {
        self.slots.borrow().iter().filter(|s| s.is_some()).count()
    }

    fn get(&self, slot: usize) -> Option<Arc<HostObject>> {
        self.slots.borrow().get(slot).cloned().flatten()
    }
}

impl Drop for LocalScope {
    fn drop(&mut self) {
        let live = self.live_count();
        if live > 0 {
            tracing::trace!(live, "releasing local references at scope exit");
        }
    }
}

impl fmt::Debug for LocalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalScope")
            .field("live", &self.live_count())
            .finish()
    }
}

/// Scope-local host reference.
#[derive(Clone, Copy)]
pub struct LocalRef<'s> {
    scope: &'s LocalScope,
    slot: usize,
}

impl<'s> LocalRef<'s> {
    /// The referenced object, or `None` once released.
    pub fn get(&self) -> Option<Arc<HostObject>> {
        self.scope.get(self.slot)
    }

    pub fn scope(&self) -> &'s LocalScope {
        self.scope
    }
}

impl fmt::Debug for LocalRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRef")
            .field("slot", &self.slot)
            .field("object", &self.get())
            .finish()
    }
}

/// Process-wide table backing [`GlobalRef`]s.
#[derive(Debug, Default)]
pub(crate) struct GlobalTable {
    entries: DashMap<u64, Arc<HostObject>>,
    next_id: AtomicU64,
}

impl GlobalTable {
    pub(crate) fn promote(self: &Arc<Self>, object: Arc<HostObject>) -> GlobalRef {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries.insert(id, object);
        tracing::trace!(id, "global reference created");
        GlobalRef {
            id,
            table: Arc::clone(self),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Scope-independent host reference.
pub struct GlobalRef {
    id: u64,
    table: Arc<GlobalTable>,
}

impl GlobalRef {
    pub fn get(&self) -> Option<Arc<HostObject>> {
        self.table.entries.get(&self.id).map(|e| Arc::clone(e.value()))
    }

    /// New local reference to the same object in `scope`.
    pub fn to_local<'s>(&self, scope: &'s LocalScope) -> Option<LocalRef<'s>> {
        self.get().map(|object| scope.create_local_reference(object))
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GlobalRef {
    fn drop(&mut self) {
        if self.table.entries.remove(&self.id).is_some() {
            tracing::trace!(id = self.id, "global reference released");
        }
    }
}

impl fmt::Debug for GlobalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalRef").field("id", &self.id).finish()
    }
}
