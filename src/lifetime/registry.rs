//! Per-owner registry of [`Depositable`] resources.
//!
//! Every scan-and-mutate sequence runs under the owner's [`Lock`], which is
//! reentrant: a resource's `will_remove` may deposit into or remove from the
//! same registry on the same thread. The entry map itself sits behind a short
//! internal mutex that is never held while a resource hook runs.
//!
//! Once [`release_all`](DepositRegistry::release_all) has run the registry is
//! closed. Depositing into a closed registry releases the resource at once.

use super::depositable::DepositableRef;
use crate::sync::Lock;
use crate::tracing_compat::{debug, trace};
use crate::types::{PressureListener, generate_id};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Default)]
struct RegistryState {
    entries: HashMap<String, DepositableRef>,
    closed: bool,
}

/// Keyed store of resources bound to one owner.
pub struct DepositRegistry {
    lock: Arc<Lock>,
    state: Mutex<RegistryState>,
}

impl DepositRegistry {
    /// Creates an empty registry serialized by `lock`.
    #[must_use]
    pub fn new(lock: Arc<Lock>) -> Self {
        Self {
            lock,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Registers `resource` under `id` (or a generated id) and returns the id.
    ///
    /// `did_add` runs right after the entry is stored. A resource already
    /// registered under the same id is displaced and receives `will_remove`.
    pub fn deposit(&self, resource: DepositableRef, id: Option<&str>) -> String {
        let id = id.map_or_else(generate_id, ToString::to_string);
        let _guard = self.lock.lock();
        let (displaced, closed) = {
            let mut state = self.state.lock();
            if state.closed {
                (None, true)
            } else {
                (state.entries.insert(id.clone(), Arc::clone(&resource)), false)
            }
        };
        if closed {
            debug!(id = %id, "deposit after owner died; releasing immediately");
            resource.did_add();
            resource.will_remove();
            return id;
        }
        if let Some(previous) = displaced {
            trace!(id = %id, "deposit displaced an existing entry");
            previous.will_remove();
        }
        resource.did_add();
        trace!(id = %id, "deposited");
        id
    }

    /// Returns the resource registered under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<DepositableRef> {
        let _guard = self.lock.lock();
        self.state.lock().entries.get(id).cloned()
    }

    /// Removes the entry under `id`, calling `will_remove` first.
    ///
    /// Returns true if an entry was present.
    pub fn remove(&self, id: &str) -> bool {
        let _guard = self.lock.lock();
        let Some(resource) = self.state.lock().entries.get(id).cloned() else {
            return false;
        };
        resource.will_remove();
        let mut state = self.state.lock();
        // will_remove may have replaced or removed the entry itself.
        if state
            .entries
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, &resource))
        {
            state.entries.remove(id);
        }
        drop(state);
        trace!(id = %id, "deposit removed");
        true
    }

    /// Evicts every entry whose `should_remove` is true.
    ///
    /// Returns the number of entries evicted.
    pub fn relieve_pressure(&self) -> usize {
        let _guard = self.lock.lock();
        let snapshot: Vec<(String, DepositableRef)> = self
            .state
            .lock()
            .entries
            .iter()
            .map(|(id, r)| (id.clone(), Arc::clone(r)))
            .collect();

        let mut evicted = 0;
        for (id, resource) in snapshot {
            if !resource.should_remove() {
                continue;
            }
            resource.will_remove();
            let mut state = self.state.lock();
            if state
                .entries
                .get(&id)
                .is_some_and(|current| Arc::ptr_eq(current, &resource))
            {
                state.entries.remove(&id);
            }
            evicted += 1;
        }
        debug!(evicted, "pressure pass finished");
        evicted
    }

    /// Closes the registry and releases every entry exactly once.
    ///
    /// Returns the number of entries released.
    pub fn release_all(&self) -> usize {
        let _guard = self.lock.lock();
        let entries = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.entries)
        };
        let count = entries.len();
        for resource in entries.into_values() {
            resource.will_remove();
        }
        debug!(released = count, "registry released");
        count
    }

    /// Number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the registry has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Ids currently registered, in no particular order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.state.lock().entries.keys().cloned().collect()
    }
}

impl PressureListener for DepositRegistry {
    fn on_pressure(&self) {
        self.relieve_pressure();
    }
}

impl fmt::Debug for DepositRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DepositRegistry")
            .field("entries", &state.entries.len())
            .field("closed", &state.closed)
            .finish()
    }
}
