//! System pressure measurement and low-resource broadcast.
//!
//! [`SystemPressure`] carries an atomic headroom value (0.0–1.0) that can be
//! shared across threads and read lock-free. Whoever samples the host (memory
//! warnings, load average) updates the headroom; when it drops below the
//! configured threshold every subscribed [`PressureListener`] is told to shed
//! what it can. [`signal`](SystemPressure::signal) broadcasts unconditionally.
//!
//! # Headroom Semantics
//!
//! - `1.0`: system is idle, full headroom available
//! - `0.3`: default threshold, listeners start evicting idle resources
//! - `0.0`: critically overloaded

use crate::tracing_compat::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Default headroom below which a pressure broadcast is issued.
pub const DEFAULT_PRESSURE_THRESHOLD: f32 = 0.3;

/// Receiver of low-resource-pressure broadcasts.
pub trait PressureListener: Send + Sync {
    /// Called once per broadcast, outside any pressure-internal lock.
    fn on_pressure(&self);
}

/// Atomic system pressure state shared via `Arc<SystemPressure>`.
#[derive(Debug)]
pub struct SystemPressure {
    /// Headroom stored as f32 bits (AtomicU32 for lock-free access).
    headroom_bits: AtomicU32,
    /// Broadcast threshold stored as f32 bits.
    threshold_bits: AtomicU32,
    listeners: Mutex<Vec<(u64, Weak<dyn PressureListener>)>>,
    next_listener: AtomicU64,
}

impl SystemPressure {
    /// Create a new pressure state at full headroom (1.0).
    #[must_use]
    pub fn new() -> Self {
        Self::with_headroom(1.0)
    }

    /// Create with an explicit initial headroom value.
    ///
    /// Headroom is clamped to `[0.0, 1.0]`.
    #[must_use]
    pub fn with_headroom(headroom: f32) -> Self {
        let clamped = headroom.clamp(0.0, 1.0);
        Self {
            headroom_bits: AtomicU32::new(clamped.to_bits()),
            threshold_bits: AtomicU32::new(DEFAULT_PRESSURE_THRESHOLD.to_bits()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Sets the broadcast threshold (clamped to `[0.0, 1.0]`).
    #[must_use]
    pub fn with_threshold(self, threshold: f32) -> Self {
        self.threshold_bits
            .store(threshold.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
        self
    }

    /// Read the current headroom (0.0–1.0).
    ///
    /// Uses `Relaxed` ordering: reads may be slightly stale but are
    /// always valid f32 values in `[0.0, 1.0]`.
    #[must_use]
    pub fn headroom(&self) -> f32 {
        f32::from_bits(self.headroom_bits.load(Ordering::Relaxed))
    }

    /// Returns the broadcast threshold.
    #[must_use]
    pub fn threshold(&self) -> f32 {
        f32::from_bits(self.threshold_bits.load(Ordering::Relaxed))
    }

    /// Update the headroom value.
    ///
    /// Headroom is clamped to `[0.0, 1.0]`. Crossing from at-or-above the
    /// threshold to below it broadcasts once; staying below does not
    /// re-broadcast. Returns the number of listeners notified.
    pub fn set_headroom(&self, headroom: f32) -> usize {
        let clamped = headroom.clamp(0.0, 1.0);
        let previous = f32::from_bits(
            self.headroom_bits
                .swap(clamped.to_bits(), Ordering::Relaxed),
        );
        let threshold = self.threshold();
        if previous >= threshold && clamped < threshold {
            self.signal()
        } else {
            0
        }
    }

    /// True if headroom is below the given threshold.
    #[must_use]
    pub fn should_degrade(&self, threshold: f32) -> bool {
        self.headroom() < threshold
    }

    /// True if headroom is below the configured broadcast threshold.
    #[must_use]
    pub fn under_pressure(&self) -> bool {
        self.should_degrade(self.threshold())
    }

    /// Human-readable label for the current headroom.
    #[must_use]
    pub fn level_label(&self) -> &'static str {
        let h = self.headroom();
        if h >= 0.5 {
            "normal"
        } else if h >= self.threshold() {
            "warning"
        } else if h >= 0.05 {
            "critical"
        } else {
            "emergency"
        }
    }

    /// Subscribes a listener. The listener is held weakly.
    ///
    /// Dropping the returned [`PressureSubscription`] unsubscribes.
    pub fn subscribe(self: &Arc<Self>, listener: Weak<dyn PressureListener>) -> PressureSubscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, listener));
        PressureSubscription {
            pressure: Arc::downgrade(self),
            id,
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|(_, l)| l.strong_count() > 0)
            .count()
    }

    /// Broadcasts a low-resource-pressure signal to every live listener.
    ///
    /// Returns the number of listeners notified.
    pub fn signal(&self) -> usize {
        let live: Vec<Arc<dyn PressureListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|(_, l)| l.strong_count() > 0);
            listeners.iter().filter_map(|(_, l)| l.upgrade()).collect()
        };
        debug!(
            listeners = live.len(),
            headroom = self.headroom(),
            "broadcasting pressure signal"
        );
        for listener in &live {
            listener.on_pressure();
        }
        live.len()
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }
}

impl Default for SystemPressure {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration of a [`PressureListener`]; unsubscribes on drop.
#[derive(Debug)]
pub struct PressureSubscription {
    pressure: Weak<SystemPressure>,
    id: u64,
}

impl Drop for PressureSubscription {
    fn drop(&mut self) {
        if let Some(pressure) = self.pressure.upgrade() {
            pressure.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Counting(AtomicUsize);

    impl PressureListener for Counting {
        fn on_pressure(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting() -> Arc<Counting> {
        Arc::new(Counting(AtomicUsize::new(0)))
    }

    #[test]
    fn new_starts_at_full_headroom() {
        let p = SystemPressure::new();
        assert!((p.headroom() - 1.0).abs() < f32::EPSILON);
        assert!(!p.under_pressure());
        assert_eq!(p.level_label(), "normal");
    }

    #[test]
    fn headroom_clamped() {
        let p = SystemPressure::new();
        p.set_headroom(1.5);
        assert!((p.headroom() - 1.0).abs() < f32::EPSILON);
        p.set_headroom(-0.3);
        assert!(p.headroom().abs() < f32::EPSILON);
    }

    #[test]
    fn crossing_threshold_broadcasts_once() {
        let p = Arc::new(SystemPressure::new());
        let listener = counting();
        let weak: Weak<dyn PressureListener> = Arc::downgrade(&listener) as Weak<dyn PressureListener>;
        let _sub = p.subscribe(weak);

        assert_eq!(p.set_headroom(0.6), 0);
        assert_eq!(p.set_headroom(0.2), 1);
        assert_eq!(p.set_headroom(0.1), 0);
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);

        p.set_headroom(0.9);
        p.set_headroom(0.05);
        assert_eq!(listener.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let p = Arc::new(SystemPressure::new());
        let listener = counting();
        let weak: Weak<dyn PressureListener> = Arc::downgrade(&listener) as Weak<dyn PressureListener>;
        let sub = p.subscribe(weak);
        assert_eq!(p.listener_count(), 1);
        drop(sub);
        assert_eq!(p.listener_count(), 0);
        assert_eq!(p.signal(), 0);
    }

    #[test]
    fn dead_listeners_are_pruned() {
        let p = Arc::new(SystemPressure::new());
        let listener = counting();
        let weak: Weak<dyn PressureListener> = Arc::downgrade(&listener) as Weak<dyn PressureListener>;
        let _sub = p.subscribe(weak);
        drop(listener);
        assert_eq!(p.signal(), 0);
    }

    #[test]
    fn custom_threshold() {
        let p = SystemPressure::new().with_threshold(0.8);
        p.set_headroom(0.7);
        assert!(p.under_pressure());
        assert_eq!(p.level_label(), "normal");
    }
}
