//! Global work queue.
//!
//! A thread-safe unbounded queue for jobs submitted to the work pool from any
//! thread. Workers pop in FIFO order but no ordering is promised across
//! workers.

use super::Job;
use crossbeam_queue::SegQueue;
use std::fmt;

/// The shared work queue drained by worker threads.
#[derive(Default)]
pub struct GlobalQueue {
    inner: SegQueue<Job>,
}

impl GlobalQueue {
    /// Creates a new global queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: SegQueue::new(),
        }
    }

    /// Pushes a job to the global queue.
    pub fn push(&self, job: Job) {
        self.inner.push(job);
    }

    /// Pops a job from the global queue.
    pub fn pop(&self) -> Option<Job> {
        self.inner.pop()
    }

    /// Returns the number of jobs in the queue.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for GlobalQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalQueue")
            .field("len", &self.inner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn push_pop_fifo() {
        let queue = GlobalQueue::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            queue.push(Box::new(move || order.lock().push(i)));
        }
        assert_eq!(queue.len(), 3);
        while let Some(job) = queue.pop() {
            job();
        }
        assert!(queue.is_empty());
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn concurrent_push() {
        let queue = Arc::new(GlobalQueue::new());
        let ran = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let ran = Arc::clone(&ran);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let ran = Arc::clone(&ran);
                        queue.push(Box::new(move || {
                            ran.fetch_add(1, Ordering::SeqCst);
                        }));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("pusher panicked");
        }
        while let Some(job) = queue.pop() {
            job();
        }
        assert_eq!(ran.load(Ordering::SeqCst), 100);
    }
}
