//! Group join: fan out a keyed set of calls and join every outcome.
//!
//! Starting the group snapshots every key as pending, then starts each child
//! with its own callback. A child's outcome, success or error, is recorded
//! under its key and removes the key from the pending set. When nothing is
//! pending the group finishes with the full map. There is no short-circuit
//! on the first error.
//!
//! Cancelling the group cancels every child whose key is still pending.

use crate::call::{Call, CallCore, CallRef, Callback};
use crate::lifetime::Depositable;
use crate::runtime::Dispatcher;
use crate::tracing_compat::{debug, trace};
use crate::types::Outcome;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Outcomes of every child, keyed like the input map.
pub type GroupOutcome<T> = HashMap<String, Outcome<T>>;

struct GroupState<T> {
    pending: HashSet<String>,
    results: GroupOutcome<T>,
}

/// A call joining a keyed set of child calls.
pub struct Group<T> {
    core: Arc<CallCore<GroupOutcome<T>>>,
    dispatcher: Dispatcher,
    children: Vec<(String, CallRef<T>)>,
    state: Arc<Mutex<GroupState<T>>>,
}

impl<T: Send + 'static> Group<T> {
    /// Creates a group over `children`.
    pub fn new(dispatcher: Dispatcher, children: HashMap<String, CallRef<T>>) -> Self {
        Self {
            core: CallCore::new(),
            dispatcher,
            children: children.into_iter().collect(),
            state: Arc::new(Mutex::new(GroupState {
                pending: HashSet::new(),
                results: HashMap::new(),
            })),
        }
    }

    /// Keys of children whose outcome has not arrived yet.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        self.state.lock().pending.iter().cloned().collect()
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True if the group has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Erases the concrete type.
    #[must_use]
    pub fn into_ref(self) -> CallRef<GroupOutcome<T>> {
        Arc::new(self)
    }
}

impl<T: Send + 'static> Call<GroupOutcome<T>> for Group<T> {
    fn start(&self, callback: Callback<GroupOutcome<T>>) {
        let sink = {
            let _guard = self.core.lock();
            let sink = self.core.begin(callback, None);
            let mut state = self.state.lock();
            state.pending = self.children.iter().map(|(key, _)| key.clone()).collect();
            state.results = HashMap::with_capacity(self.children.len());
            sink
        };
        if self.children.is_empty() {
            sink.succeed(HashMap::new());
            return;
        }
        debug!(children = self.children.len(), "group started");

        // Children start outside the group's lock; a blocking child must not
        // hold off `cancel`.
        for (key, child) in &self.children {
            let key = key.clone();
            let state = Arc::clone(&self.state);
            let sink = sink.clone();
            child.start(Box::new(move |outcome| {
                let _guard = sink.lock();
                if sink.is_cancelled() {
                    return;
                }
                let joined = {
                    let mut state = state.lock();
                    if !state.pending.remove(&key) {
                        return;
                    }
                    state.results.insert(key.clone(), outcome);
                    trace!(key = %key, remaining = state.pending.len(), "group child arrived");
                    if state.pending.is_empty() {
                        Some(std::mem::take(&mut state.results))
                    } else {
                        None
                    }
                };
                if let Some(results) = joined {
                    debug!(children = results.len(), "group joined");
                    sink.succeed(results);
                }
            }));
        }
        if sink.was_cancelled() {
            for (_, child) in &self.children {
                child.cancel();
            }
        }
    }

    fn is_executing(&self) -> bool {
        self.core.is_executing()
    }

    fn cancel(&self) {
        self.core.cancel(|| {});
        let pending: HashSet<String> = std::mem::take(&mut self.state.lock().pending);
        for (key, child) in &self.children {
            if pending.contains(key) {
                child.cancel();
            }
        }
    }

    fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl<T: Send + 'static> Depositable for Group<T> {
    fn should_remove(&self) -> bool {
        !self.is_executing()
    }

    fn will_remove(&self) {
        self.cancel();
    }
}

impl<T> fmt::Debug for Group<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Group")
            .field("children", &self.children.len())
            .field("pending", &state.pending.len())
            .field("core", &self.core)
            .finish()
    }
}

/// Joins `children` into one call whose value maps each key to its outcome.
pub fn group<T: Send + 'static>(
    dispatcher: Dispatcher,
    children: HashMap<String, CallRef<T>>,
) -> CallRef<GroupOutcome<T>> {
    Group::new(dispatcher, children).into_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{BaseCall, ComposableCall, Sink};
    use crate::runtime::LabExecutor;
    use crate::test_utils::{Recorder, init_test_logging};

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn empty_group_succeeds_immediately() {
        init_test("empty_group_succeeds_immediately");
        let lab = LabExecutor::new();
        let joined = group::<u8>(lab.dispatcher(), HashMap::new());
        let recorder = Recorder::new();
        joined.start(recorder.callback());
        assert_eq!(recorder.take(), vec![Outcome::Ok(HashMap::new())]);
        crate::test_complete!("empty_group_succeeds_immediately");
    }

    #[test]
    fn pending_shrinks_as_children_arrive() {
        init_test("pending_shrinks_as_children_arrive");
        let lab = LabExecutor::new();
        let slot: Arc<Mutex<Option<Sink<u8>>>> = Arc::new(Mutex::new(None));
        let captured = Arc::clone(&slot);
        let manual = BaseCall::new(lab.dispatcher(), move |sink: Sink<u8>| {
            *captured.lock() = Some(sink);
        })
        .into_ref();
        let mut children = HashMap::new();
        children.insert("fast".to_string(), ComposableCall::value(lab.dispatcher(), 1).into_ref());
        children.insert("slow".to_string(), manual);
        let joined = Group::new(lab.dispatcher(), children);
        assert_eq!(joined.len(), 2);

        let recorder = Recorder::new();
        joined.start(recorder.callback());
        lab.run_until_idle();
        assert_eq!(joined.pending(), vec!["slow".to_string()]);
        assert!(joined.is_executing());

        let sink = slot.lock().take().expect("slow child started");
        sink.succeed(2);
        assert!(joined.pending().is_empty());
        let results = recorder.take().pop().and_then(|o| o.into_result().ok());
        let results = results.expect("joined");
        assert_eq!(results["fast"], Outcome::Ok(1));
        assert_eq!(results["slow"], Outcome::Ok(2));
        crate::test_complete!("pending_shrinks_as_children_arrive");
    }

    #[test]
    fn restarted_group_joins_again() {
        init_test("restarted_group_joins_again");
        let lab = LabExecutor::new();
        let mut children = HashMap::new();
        children.insert("x".to_string(), ComposableCall::value(lab.dispatcher(), 'x').into_ref());
        let joined = group(lab.dispatcher(), children);
        let recorder = Recorder::new();

        joined.start(recorder.callback());
        lab.run_until_idle();
        joined.start(recorder.callback());
        lab.run_until_idle();
        assert_eq!(recorder.count(), 2);
        crate::test_complete!("restarted_group_joins_again");
    }
}
