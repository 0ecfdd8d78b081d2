//! The owner anchor a host embeds to bind resources to its lifetime.

use super::death::{DeathNotifier, ObserverHandle};
use super::depositable::{Depositable, DepositableRef};
use super::registry::DepositRegistry;
use crate::sync::Lock;
use crate::tracing_compat::debug;
use crate::types::{PressureListener, PressureSubscription, SystemPressure};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

const REGISTRY_OBSERVER_ID: &str = "lifecall.registry";

/// Lifetime of a host object.
///
/// Embed one in any structure that owns in-flight work. Resources deposited
/// here are released when the `Lifetime` is dropped or [`end`](Self::end) is
/// called, whichever comes first. Death observers run at the same moment.
///
/// ```
/// use lifecall::lifetime::Lifetime;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Screen {
///     lifetime: Lifetime,
/// }
///
/// let closed = Arc::new(AtomicBool::new(false));
/// let screen = Screen { lifetime: Lifetime::new() };
/// let flag = Arc::clone(&closed);
/// screen.lifetime.on_death("closed", move || flag.store(true, Ordering::SeqCst));
/// drop(screen);
/// assert!(closed.load(Ordering::SeqCst));
/// ```
pub struct Lifetime {
    lock: Arc<Lock>,
    death: DeathNotifier,
    registry: OnceLock<Arc<DepositRegistry>>,
    subscriptions: Mutex<Vec<PressureSubscription>>,
    ended: AtomicBool,
}

impl Lifetime {
    /// Creates a live lifetime with no deposits and no observers.
    #[must_use]
    pub fn new() -> Self {
        let lock = Arc::new(Lock::new());
        Self {
            death: DeathNotifier::with_lock(Arc::clone(&lock)),
            lock,
            registry: OnceLock::new(),
            subscriptions: Mutex::new(Vec::new()),
            ended: AtomicBool::new(false),
        }
    }

    /// The owner's lock. Every registry and notifier mutation holds it.
    #[must_use]
    pub fn lock(&self) -> &Lock {
        &self.lock
    }

    /// The owner's death notifier.
    #[must_use]
    pub const fn notifier(&self) -> &DeathNotifier {
        &self.death
    }

    /// Registers a death observer under `id`.
    pub fn on_death(&self, id: impl Into<String>, observer: impl FnOnce() + Send + 'static) {
        self.death.add(id, observer);
    }

    /// Registers a death observer and returns a handle that unregisters it.
    pub fn observe_death(&self, observer: impl FnOnce() + Send + 'static) -> ObserverHandle {
        self.death.observe(observer)
    }

    /// Unregisters the death observer under `id`.
    pub fn remove_death_observer(&self, id: &str) -> bool {
        self.death.remove(id)
    }

    /// The registry, created on first use.
    ///
    /// Creation registers one death observer that releases every remaining
    /// entry when the owner dies.
    pub fn registry(&self) -> &Arc<DepositRegistry> {
        self.registry.get_or_init(|| {
            let registry = Arc::new(DepositRegistry::new(Arc::clone(&self.lock)));
            let on_death = Arc::clone(&registry);
            self.death.add(REGISTRY_OBSERVER_ID, move || {
                on_death.release_all();
            });
            registry
        })
    }

    /// Registers `resource` and hands it back for chaining.
    pub fn deposit<R: Depositable + 'static>(&self, resource: Arc<R>, id: Option<&str>) -> Arc<R> {
        self.registry()
            .deposit(Arc::clone(&resource) as DepositableRef, id);
        resource
    }

    /// Registers a type-erased resource and returns the id used.
    pub fn deposit_resource(&self, resource: DepositableRef, id: Option<&str>) -> String {
        self.registry().deposit(resource, id)
    }

    /// Looks up a deposited resource.
    #[must_use]
    pub fn deposited(&self, id: &str) -> Option<DepositableRef> {
        self.registry.get().and_then(|registry| registry.get(id))
    }

    /// Removes a deposited resource, calling its `will_remove` first.
    pub fn remove_deposited(&self, id: &str) -> bool {
        self.registry
            .get()
            .is_some_and(|registry| registry.remove(id))
    }

    /// Number of deposited resources.
    #[must_use]
    pub fn deposit_count(&self) -> usize {
        self.registry.get().map_or(0, |registry| registry.len())
    }

    /// Runs a pressure pass now, evicting every removable entry.
    pub fn relieve_pressure(&self) -> usize {
        self.registry
            .get()
            .map_or(0, |registry| registry.relieve_pressure())
    }

    /// Subscribes this owner's registry to a pressure broadcast.
    ///
    /// The subscription lasts until the lifetime ends.
    pub fn subscribe_pressure(&self, pressure: &Arc<SystemPressure>) {
        let registry = Arc::clone(self.registry());
        let listener: Weak<dyn PressureListener> =
            Arc::downgrade(&registry) as Weak<dyn PressureListener>;
        let subscription = pressure.subscribe(listener);
        self.subscriptions.lock().push(subscription);
    }

    /// True once the lifetime has ended.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// Ends the lifetime now: drops pressure subscriptions, then fires the
    /// death notifier, which releases every deposit.
    ///
    /// Only the first call (or the drop) does anything.
    pub fn end(&self) {
        if self.ended.swap(true, Ordering::AcqRel) {
            return;
        }
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        drop(subscriptions);
        let observers = self.death.fire();
        debug!(observers, "lifetime ended");
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        self.end();
    }
}

impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifetime")
            .field("deposits", &self.deposit_count())
            .field("observers", &self.death.len())
            .field("ended", &self.is_ended())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::sync::atomic::AtomicUsize;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    struct Probe {
        removable: bool,
        removed: AtomicUsize,
    }

    impl Probe {
        fn new(removable: bool) -> Arc<Self> {
            Arc::new(Self {
                removable,
                removed: AtomicUsize::new(0),
            })
        }
        fn removed(&self) -> usize {
            self.removed.load(Ordering::SeqCst)
        }
    }

    impl Depositable for Probe {
        fn should_remove(&self) -> bool {
            self.removable
        }
        fn will_remove(&self) {
            self.removed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn registry_is_lazy() {
        init_test("registry_is_lazy");
        let lifetime = Lifetime::new();
        assert_eq!(lifetime.deposit_count(), 0);
        assert!(lifetime.notifier().is_empty());
        assert!(lifetime.deposited("r1").is_none());
        let _ = lifetime.registry();
        assert!(lifetime.notifier().contains(REGISTRY_OBSERVER_ID));
        crate::test_complete!("registry_is_lazy");
    }

    #[test]
    fn drop_releases_each_deposit_once() {
        init_test("drop_releases_each_deposit_once");
        let probe = Probe::new(false);
        {
            let lifetime = Lifetime::new();
            let same = lifetime.deposit(Arc::clone(&probe), Some("r1"));
            assert!(Arc::ptr_eq(&same, &probe));
            assert!(lifetime.deposited("r1").is_some());
        }
        assert_eq!(probe.removed(), 1);
        crate::test_complete!("drop_releases_each_deposit_once");
    }

    #[test]
    fn end_then_drop_fires_once() {
        init_test("end_then_drop_fires_once");
        let probe = Probe::new(false);
        let deaths = Arc::new(AtomicUsize::new(0));
        let lifetime = Lifetime::new();
        lifetime.deposit(Arc::clone(&probe), None);
        let d = Arc::clone(&deaths);
        lifetime.on_death("count", move || {
            d.fetch_add(1, Ordering::SeqCst);
        });
        lifetime.end();
        assert!(lifetime.is_ended());
        drop(lifetime);
        assert_eq!(probe.removed(), 1);
        assert_eq!(deaths.load(Ordering::SeqCst), 1);
        crate::test_complete!("end_then_drop_fires_once");
    }

    #[test]
    fn pressure_broadcast_reaches_subscribed_owner() {
        init_test("pressure_broadcast_reaches_subscribed_owner");
        let pressure = Arc::new(SystemPressure::new());
        let lifetime = Lifetime::new();
        let idle = lifetime.deposit(Probe::new(true), Some("idle"));
        let busy = lifetime.deposit(Probe::new(false), Some("busy"));
        lifetime.subscribe_pressure(&pressure);

        assert_eq!(pressure.signal(), 1);
        assert_eq!(idle.removed(), 1);
        assert_eq!(busy.removed(), 0);
        assert_eq!(lifetime.deposit_count(), 1);

        drop(lifetime);
        assert_eq!(pressure.listener_count(), 0);
        assert_eq!(busy.removed(), 1);
        crate::test_complete!("pressure_broadcast_reaches_subscribed_owner");
    }

    #[test]
    fn remove_deposited_releases_and_forgets() {
        init_test("remove_deposited_releases_and_forgets");
        let lifetime = Lifetime::new();
        let probe = lifetime.deposit(Probe::new(false), Some("r1"));
        assert!(lifetime.remove_deposited("r1"));
        assert!(!lifetime.remove_deposited("r1"));
        drop(lifetime);
        assert_eq!(probe.removed(), 1);
        crate::test_complete!("remove_deposited_releases_and_forgets");
    }
}
