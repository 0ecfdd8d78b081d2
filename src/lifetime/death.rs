//! Death notifier: callbacks fired exactly once when an owner is destroyed.
//!
//! Observers are kept in registration order under string ids. Registering an
//! existing id replaces the previous callback in place. When the owner dies
//! the whole list is taken under the owner's [`Lock`] and each callback runs
//! once, outside any internal lock, so an observer may touch the owner's
//! other state.
//!
//! An observer registered after the notifier has fired runs immediately: the
//! owner is already gone.

use crate::sync::Lock;
use crate::tracing_compat::{debug, trace};
use crate::types::generate_id;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

type Observer = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct NotifierState {
    observers: Vec<(String, Observer)>,
    fired: bool,
}

struct NotifierInner {
    lock: Arc<Lock>,
    state: Mutex<NotifierState>,
}

impl NotifierInner {
    fn remove(&self, id: &str) -> bool {
        let _guard = self.lock.lock();
        let mut state = self.state.lock();
        let before = state.observers.len();
        state.observers.retain(|(oid, _)| oid != id);
        before != state.observers.len()
    }
}

/// Per-owner list of death observers.
#[derive(Clone)]
pub struct DeathNotifier {
    inner: Arc<NotifierInner>,
}

impl DeathNotifier {
    /// Creates a notifier guarded by its own lock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lock(Arc::new(Lock::new()))
    }

    /// Creates a notifier that serializes on the owner's lock.
    #[must_use]
    pub fn with_lock(lock: Arc<Lock>) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                lock,
                state: Mutex::new(NotifierState::default()),
            }),
        }
    }

    /// Registers `observer` under `id`, replacing any observer with that id.
    pub fn add(&self, id: impl Into<String>, observer: impl FnOnce() + Send + 'static) {
        let id = id.into();
        let observer: Observer = Box::new(observer);
        let late = {
            let _guard = self.inner.lock.lock();
            let mut state = self.inner.state.lock();
            if state.fired {
                Some(observer)
            } else {
                if let Some(slot) = state.observers.iter_mut().find(|(oid, _)| *oid == id) {
                    slot.1 = observer;
                } else {
                    state.observers.push((id.clone(), observer));
                }
                None
            }
        };
        match late {
            Some(observer) => {
                debug!(id = %id, "death observer added after owner died; running now");
                observer();
            }
            None => {
                trace!(id = %id, "death observer added");
            }
        }
    }

    /// Registers `observer` under a freshly generated id and returns the id.
    pub fn add_anonymous(&self, observer: impl FnOnce() + Send + 'static) -> String {
        let id = generate_id();
        self.add(id.clone(), observer);
        id
    }

    /// Registers `observer` and returns a handle that unregisters it on drop.
    pub fn observe(&self, observer: impl FnOnce() + Send + 'static) -> ObserverHandle {
        let id = self.add_anonymous(observer);
        ObserverHandle {
            notifier: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    /// Unregisters the observer with `id`. Returns true if one was present.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.inner.remove(id);
        if removed {
            trace!(id = %id, "death observer removed");
        }
        removed
    }

    /// True if an observer is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .state
            .lock()
            .observers
            .iter()
            .any(|(oid, _)| oid == id)
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().observers.len()
    }

    /// True if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once [`fire`](Self::fire) has run.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.inner.state.lock().fired
    }

    /// Runs every registered observer once and discards the list.
    ///
    /// Only the first call does anything. Returns the number of observers run.
    pub fn fire(&self) -> usize {
        let observers = {
            let _guard = self.inner.lock.lock();
            let mut state = self.inner.state.lock();
            if state.fired {
                return 0;
            }
            state.fired = true;
            std::mem::take(&mut state.observers)
        };
        let count = observers.len();
        debug!(observers = count, "owner died; notifying observers");
        for (_, observer) in observers {
            observer();
        }
        count
    }
}

impl Default for DeathNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeathNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("DeathNotifier")
            .field("observers", &state.observers.len())
            .field("fired", &state.fired)
            .finish()
    }
}

/// Registration returned by [`DeathNotifier::observe`].
///
/// Dropping the handle (or calling [`remove`](Self::remove)) unregisters the
/// observer. [`detach`](Self::detach) keeps it registered for the owner's
/// whole life.
#[must_use = "dropping the handle unregisters the observer"]
pub struct ObserverHandle {
    notifier: Weak<NotifierInner>,
    id: Option<String>,
}

impl ObserverHandle {
    /// The generated id of the registration.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Unregisters the observer. Returns true if it had not fired yet.
    pub fn remove(mut self) -> bool {
        self.release()
    }

    /// Keeps the observer registered and returns its id.
    pub fn detach(mut self) -> String {
        self.id.take().unwrap_or_default()
    }

    fn release(&mut self) -> bool {
        match (self.id.take(), self.notifier.upgrade()) {
            (Some(id), Some(notifier)) => notifier.remove(&id),
            _ => false,
        }
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("id", &self.id)
            .finish()
    }
}
