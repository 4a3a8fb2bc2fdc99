// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-worker batching buffer.
//!
//! Accumulates records drained from the intake queue and signals a flush
//! either when the batch is large enough or when the configured interval has
//! elapsed since the last flush attempt.

use crate::queue::IntakeQueue;
use crate::record::Record;
use std::time::{Duration, Instant};

/// A batching buffer owned by exactly one flush worker.
///
/// The flush trigger fires when either:
/// - the buffer holds at least `bulk_size` records (size-based flush)
/// - `flush_interval` has elapsed since the last flush (time-based flush)
pub struct BatchBuffer {
    records: Vec<Record>,
    bulk_size: usize,
    flush_interval: Duration,
    last_flush: Instant,
}

impl BatchBuffer {
    /// Create a new batch buffer.
    ///
    /// # Arguments
    /// - `bulk_size` - Record count that triggers a size-based flush
    /// - `flush_interval` - Maximum time between flushes
    pub fn new(bulk_size: usize, flush_interval: Duration) -> Self {
        Self {
            records: Vec::with_capacity(bulk_size),
            bulk_size,
            flush_interval,
            last_flush: Instant::now(),
        }
    }

    /// Add a record to the buffer.
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Opportunistically move every available record from the queue.
    ///
    /// Returns the number of records moved.
    pub fn fill_from(&mut self, queue: &IntakeQueue) -> usize {
        queue.drain_into(&mut self.records)
    }

    /// Evaluate the flush trigger (size or time).
    ///
    /// The trigger may be true for an empty buffer; callers skip the bulk
    /// call in that case.
    pub fn trigger(&self) -> bool {
        self.records.len() >= self.bulk_size || self.last_flush.elapsed() >= self.flush_interval
    }

    /// Check if a flush is due and there is something to flush.
    pub fn should_flush(&self) -> bool {
        !self.records.is_empty() && self.trigger()
    }

    /// Take all buffered records and reset the flush timer.
    pub fn take(&mut self) -> Vec<Record> {
        self.last_flush = Instant::now();
        std::mem::replace(&mut self.records, Vec::with_capacity(self.bulk_size))
    }

    /// Time since the last flush attempt.
    pub fn since_last_flush(&self) -> Duration {
        self.last_flush.elapsed()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn rec(n: i64) -> Record {
        let mut r = Record::new();
        r.insert("n", Value::Integer(n));
        r
    }

    #[test]
    fn test_batch_buffer_no_trigger_until_full() {
        let mut buf = BatchBuffer::new(3, Duration::from_secs(60));

        buf.push(rec(1));
        buf.push(rec(2));
        assert_eq!(buf.len(), 2);
        assert!(!buf.should_flush());

        buf.push(rec(3));
        assert!(buf.should_flush());
    }

    #[test]
    fn test_batch_buffer_take_resets() {
        let mut buf = BatchBuffer::new(2, Duration::from_secs(60));
        buf.push(rec(1));
        buf.push(rec(2));

        let batch = buf.take();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].get("n"), Some(&Value::Integer(1)));
        assert_eq!(batch[1].get("n"), Some(&Value::Integer(2)));

        assert!(buf.is_empty());
        assert!(!buf.should_flush());
    }

    #[test]
    fn test_batch_buffer_time_based_flush() {
        let mut buf = BatchBuffer::new(1000, Duration::from_millis(0));
        buf.push(rec(1));

        // Zero interval: the time trigger is immediately true
        assert!(buf.should_flush());
        assert_eq!(buf.take().len(), 1);
    }

    #[test]
    fn test_batch_buffer_empty_never_flushes() {
        let buf = BatchBuffer::new(10, Duration::from_millis(0));
        assert!(buf.trigger());
        assert!(!buf.should_flush());
    }

    #[test]
    fn test_fill_from_queue() {
        let q = IntakeQueue::new(16);
        for i in 0..10 {
            q.try_push(rec(i)).unwrap();
        }

        let mut buf = BatchBuffer::new(4, Duration::from_secs(60));
        assert_eq!(buf.fill_from(&q), 10);

        // Draining may overshoot the bulk size; the whole buffer goes out
        assert_eq!(buf.len(), 10);
        assert!(buf.should_flush());
        assert!(q.is_empty());
    }
}
