// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded intake queue.
//!
//! The single point of backpressure between the front door (producers) and
//! the flush workers (consumers). Both sides are non-blocking: a push on a
//! full queue fails immediately and hands the record back, a pop on an empty
//! queue returns `None`.
//!
//! # Design
//! - **Lock-free:** crossbeam `ArrayQueue` (MPMC-safe)
//! - **Fixed capacity:** allocated once, length never exceeds capacity
//! - **Metrics:** tracks rejected pushes (queue full events)

use crate::record::Record;
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed-capacity FIFO of parsed records shared by producers and workers.
pub struct IntakeQueue {
    ring: ArrayQueue<Record>,
    /// Count of pushes rejected because the queue was full (diagnostic)
    full_count: AtomicU64,
}

impl IntakeQueue {
    /// Create a queue holding at most `capacity` records.
    ///
    /// # Panics
    /// Panics if `capacity` is zero (validated earlier by `Config::validate`).
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "IntakeQueue capacity must be non-zero");
        Self {
            ring: ArrayQueue::new(capacity),
            full_count: AtomicU64::new(0),
        }
    }

    /// Try to enqueue a record without blocking.
    ///
    /// Returns `Err(record)` if the queue is at capacity.
    pub fn try_push(&self, record: Record) -> Result<(), Record> {
        self.ring.push(record).inspect_err(|_| {
            self.full_count.fetch_add(1, Ordering::Relaxed);
        })
    }

    /// Try to dequeue the oldest record without blocking.
    pub fn try_pop(&self) -> Option<Record> {
        self.ring.pop()
    }

    /// Move every currently available record into `out`.
    ///
    /// Stops as soon as the queue reports empty; records pushed concurrently
    /// may or may not be picked up. Returns the number of records moved.
    pub fn drain_into(&self, out: &mut Vec<Record>) -> usize {
        let mut moved = 0;
        while let Some(record) = self.ring.pop() {
            out.push(record);
            moved += 1;
        }
        moved
    }

    /// Maximum number of records the queue can hold.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Current number of queued records.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Number of pushes rejected because the queue was full.
    pub fn full_count(&self) -> u64 {
        self.full_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;
    use std::sync::Arc;
    use std::thread;

    fn rec(n: i64) -> Record {
        let mut r = Record::new();
        r.insert("n", Value::Integer(n));
        r
    }

    #[test]
    fn test_push_pop_fifo() {
        let q = IntakeQueue::new(4);
        for i in 0..3 {
            q.try_push(rec(i)).unwrap();
        }
        assert_eq!(q.len(), 3);

        for i in 0..3 {
            let r = q.try_pop().unwrap();
            assert_eq!(r.get("n"), Some(&Value::Integer(i)));
        }
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn test_push_on_full_fails_immediately() {
        let q = IntakeQueue::new(2);
        q.try_push(rec(1)).unwrap();
        q.try_push(rec(2)).unwrap();
        assert!(q.is_full());

        let rejected = q.try_push(rec(3)).unwrap_err();
        assert_eq!(rejected.get("n"), Some(&Value::Integer(3)));
        assert_eq!(q.len(), 2);
        assert_eq!(q.full_count(), 1);
    }

    #[test]
    fn test_drain_into_takes_everything_available() {
        let q = IntakeQueue::new(8);
        for i in 0..5 {
            q.try_push(rec(i)).unwrap();
        }

        let mut out = Vec::new();
        assert_eq!(q.drain_into(&mut out), 5);
        assert_eq!(out.len(), 5);
        assert!(q.is_empty());
        assert_eq!(q.drain_into(&mut out), 0);
    }

    #[test]
    fn test_concurrent_producers_never_exceed_capacity() {
        let q = Arc::new(IntakeQueue::new(100));
        let mut handles = Vec::new();

        for t in 0..4 {
            let q = Arc::clone(&q);
            handles.push(thread::spawn(move || {
                let mut accepted = 0u64;
                for i in 0..100 {
                    if q.try_push(rec(t * 1000 + i)).is_ok() {
                        accepted += 1;
                    }
                    assert!(q.len() <= q.capacity());
                }
                accepted
            }));
        }

        let accepted: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 100);
        assert_eq!(q.full_count(), 300);
    }
}
