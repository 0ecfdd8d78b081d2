//! Timer heap for deadline management.
//!
//! This module provides a small min-heap of `(deadline, payload)` pairs used by
//! executors to hold delayed main-context jobs until they are due. Entries
//! with equal deadlines pop in insertion order.

use crate::types::Time;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

struct TimerEntry<T> {
    deadline: Time,
    generation: u64,
    payload: T,
}

impl<T> PartialEq for TimerEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.generation == other.generation
    }
}

impl<T> Eq for TimerEntry<T> {}

impl<T> Ord for TimerEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest deadline first).
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

impl<T> PartialOrd for TimerEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A min-heap of timers ordered by deadline.
pub struct TimerHeap<T> {
    heap: BinaryHeap<TimerEntry<T>>,
    next_generation: u64,
}

impl<T> TimerHeap<T> {
    /// Creates a new empty timer heap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_generation: 0,
        }
    }

    /// Returns the number of timers in the heap.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if the heap is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Adds a timer with the given deadline.
    pub fn insert(&mut self, deadline: Time, payload: T) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.heap.push(TimerEntry {
            deadline,
            generation,
            payload,
        });
    }

    /// Returns the earliest deadline, if any.
    #[must_use]
    pub fn peek_deadline(&self) -> Option<Time> {
        self.heap.peek().map(|e| e.deadline)
    }

    /// Pops all payloads whose deadline is `<= now`, earliest first.
    pub fn pop_expired(&mut self, now: Time) -> Vec<T> {
        let mut expired = Vec::new();
        while self.heap.peek().is_some_and(|entry| entry.deadline <= now) {
            if let Some(entry) = self.heap.pop() {
                expired.push(entry.payload);
            }
        }
        expired
    }

    /// Clears all timers.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<T> Default for TimerHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TimerHeap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHeap")
            .field("len", &self.heap.len())
            .field("next_deadline", &self.peek_deadline())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_heap_has_no_deadline() {
        let heap: TimerHeap<u32> = TimerHeap::new();
        assert!(heap.is_empty());
        assert_eq!(heap.peek_deadline(), None);
    }

    #[test]
    fn insert_orders_by_deadline() {
        let mut heap = TimerHeap::new();
        heap.insert(Time::from_millis(200), 1);
        heap.insert(Time::from_millis(100), 2);
        heap.insert(Time::from_millis(150), 3);

        assert_eq!(heap.peek_deadline(), Some(Time::from_millis(100)));
    }

    #[test]
    fn pop_expired_returns_all_due_in_order() {
        let mut heap = TimerHeap::new();
        heap.insert(Time::from_millis(100), 1);
        heap.insert(Time::from_millis(200), 2);
        heap.insert(Time::from_millis(50), 3);

        let expired = heap.pop_expired(Time::from_millis(125));
        assert_eq!(expired, vec![3, 1]);
        assert_eq!(heap.peek_deadline(), Some(Time::from_millis(200)));
    }

    #[test]
    fn equal_deadlines_pop_in_insertion_order() {
        let mut heap = TimerHeap::new();
        for i in 0..5 {
            heap.insert(Time::from_millis(10), i);
        }
        assert_eq!(heap.pop_expired(Time::from_millis(10)), vec![0, 1, 2, 3, 4]);
    }
}
