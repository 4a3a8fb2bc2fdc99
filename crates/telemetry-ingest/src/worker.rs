// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flush worker.
//!
//! Each worker owns one store session and one [`BatchBuffer`], drains the
//! shared intake queue and issues unordered bulk inserts.
//!
//! # State machine
//!
//! ```text
//! Connecting --connect ok--> Running --token cancelled--> Draining --> Stopped
//!     |                                                                  ^
//!     +--------------------------connect failed--------------------------+
//! ```
//!
//! A failed bulk write is never retried: the buffer is cleared either way.

use crate::buffer::BatchBuffer;
use crate::queue::IntakeQueue;
use crate::stats::IngestStats;
use crate::store::{BulkWriteOptions, DocumentStore, StoreSession, WriteOp};
use crate::truncate;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Maximum characters of store error detail written to the log.
const ERROR_DETAIL_CHARS: usize = 100;

/// Flush tuning shared by all workers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlushSettings {
    /// Record count that triggers a flush
    pub bulk_size: usize,
    /// Maximum time between flushes
    pub flush_interval: Duration,
    /// Sleep between loop iterations
    pub idle_interval: Duration,
}

impl Default for FlushSettings {
    fn default() -> Self {
        Self {
            bulk_size: 64,
            flush_interval: Duration::from_millis(250),
            idle_interval: Duration::from_millis(100),
        }
    }
}

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Connecting,
    Running,
    Draining,
    Stopped,
}

/// Why a flush happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushReason {
    Trigger,
    Final,
}

/// Summary returned by a stopped worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: usize,
    /// False if the worker never got a store session
    pub connected: bool,
    /// Bulk write calls issued (including the final one)
    pub flushes: u64,
    /// True if the drain step issued a final bulk write
    pub final_flush: bool,
    pub written: u64,
    pub failed: u64,
}

/// One flush worker; consumed by [`FlushWorker::run`].
pub struct FlushWorker {
    id: usize,
    queue: Arc<IntakeQueue>,
    store: Arc<dyn DocumentStore>,
    stats: Arc<IngestStats>,
    settings: FlushSettings,
    token: CancellationToken,
    state: WorkerState,
    report: WorkerReport,
}

impl FlushWorker {
    pub fn new(
        id: usize,
        queue: Arc<IntakeQueue>,
        store: Arc<dyn DocumentStore>,
        stats: Arc<IngestStats>,
        settings: FlushSettings,
        token: CancellationToken,
    ) -> Self {
        Self {
            id,
            queue,
            store,
            stats,
            settings,
            token,
            state: WorkerState::Connecting,
            report: WorkerReport {
                id,
                ..Default::default()
            },
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Run the worker to completion on the current thread.
    pub fn run(mut self) -> WorkerReport {
        let mut session = match self.store.connect() {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(
                    worker = self.id,
                    error = %truncate(&e.to_string(), ERROR_DETAIL_CHARS),
                    "store connect failed, worker stopping"
                );
                self.stats.record_worker_failed();
                self.transition(WorkerState::Stopped);
                return self.report;
            }
        };
        self.report.connected = true;
        self.transition(WorkerState::Running);

        let mut buffer = BatchBuffer::new(self.settings.bulk_size, self.settings.flush_interval);

        while !self.token.is_cancelled() {
            buffer.fill_from(&self.queue);
            if buffer.should_flush() {
                self.flush(&mut *session, &mut buffer, FlushReason::Trigger);
            }
            std::thread::sleep(self.settings.idle_interval);
        }

        self.transition(WorkerState::Draining);
        buffer.fill_from(&self.queue);
        if !buffer.is_empty() {
            self.flush(&mut *session, &mut buffer, FlushReason::Final);
        }

        self.transition(WorkerState::Stopped);
        self.report
    }

    fn transition(&mut self, next: WorkerState) {
        tracing::debug!(worker = self.id, from = ?self.state, to = ?next, "worker state");
        self.state = next;
    }

    /// Write the whole buffer in one unordered bulk call, then clear it.
    fn flush(&mut self, session: &mut dyn StoreSession, buffer: &mut BatchBuffer, reason: FlushReason) {
        let batch = buffer.take();
        let len = batch.len() as u64;
        let ops: Vec<WriteOp> = batch
            .into_iter()
            .map(|record| WriteOp::InsertOne(record.into_document()))
            .collect();

        let written = match session.bulk_write(ops, BulkWriteOptions::unordered()) {
            Ok(result) => {
                tracing::debug!(
                    worker = self.id,
                    ?reason,
                    inserted = result.inserted,
                    upserted = result.upserted,
                    "bulk write ok"
                );
                result.inserted.min(len)
            }
            Err(e) => {
                let inserted = e.inserted(len);
                tracing::error!(
                    worker = self.id,
                    ?reason,
                    batch = len,
                    inserted,
                    error = %truncate(&e.to_string(), ERROR_DETAIL_CHARS),
                    "bulk write failed, dropping batch"
                );
                inserted
            }
        };
        let failed = len - written;

        self.stats.record_flush(written, failed);
        self.report.flushes += 1;
        self.report.written += written;
        self.report.failed += failed;
        if reason == FlushReason::Final {
            self.report.final_flush = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::record::{Record, Value};
    use std::thread;

    fn rec(n: i64) -> Record {
        let mut r = Record::new();
        r.insert("n", Value::Integer(n));
        r
    }

    fn fast_settings(bulk_size: usize, flush_interval: Duration) -> FlushSettings {
        FlushSettings {
            bulk_size,
            flush_interval,
            idle_interval: Duration::from_millis(5),
        }
    }

    fn worker(
        store: &MemoryStore,
        queue: &Arc<IntakeQueue>,
        stats: &Arc<IngestStats>,
        settings: FlushSettings,
        token: &CancellationToken,
    ) -> FlushWorker {
        FlushWorker::new(
            0,
            Arc::clone(queue),
            Arc::new(store.clone()),
            Arc::clone(stats),
            settings,
            token.clone(),
        )
    }

    #[test]
    fn test_connect_failure_stops_worker() {
        let store = MemoryStore::new();
        store.set_fail_connect(true);
        let queue = Arc::new(IntakeQueue::new(8));
        let stats = Arc::new(IngestStats::new());
        let token = CancellationToken::new();

        let report = worker(&store, &queue, &stats, FlushSettings::default(), &token).run();

        assert!(!report.connected);
        assert_eq!(report.flushes, 0);
        assert_eq!(stats.snapshot().workers_failed, 1);
    }

    #[test]
    fn test_size_trigger_flushes_while_running() {
        let store = MemoryStore::new();
        let queue = Arc::new(IntakeQueue::new(64));
        let stats = Arc::new(IngestStats::new());
        let token = CancellationToken::new();

        for i in 0..10 {
            queue.try_push(rec(i)).unwrap();
        }

        let w = worker(&store, &queue, &stats, fast_settings(4, Duration::from_secs(3600)), &token);
        let handle = thread::spawn(move || w.run());

        thread::sleep(Duration::from_millis(100));
        assert_eq!(store.len(), 10);
        token.cancel();

        let report = handle.join().unwrap();
        assert_eq!(report.written, 10);
        assert_eq!(report.flushes, 1);
        assert!(!report.final_flush);
        assert_eq!(store.batch_sizes(), vec![10]);
    }

    #[test]
    fn test_final_flush_on_shutdown() {
        let store = MemoryStore::new();
        let queue = Arc::new(IntakeQueue::new(64));
        let stats = Arc::new(IngestStats::new());
        let token = CancellationToken::new();

        let w = worker(&store, &queue, &stats, fast_settings(100, Duration::from_secs(3600)), &token);
        let handle = thread::spawn(move || w.run());

        for i in 0..3 {
            queue.try_push(rec(i)).unwrap();
        }
        thread::sleep(Duration::from_millis(50));
        // Below size threshold, long interval: nothing written yet
        assert!(store.is_empty());

        token.cancel();
        let report = handle.join().unwrap();

        assert!(report.final_flush);
        assert_eq!(report.flushes, 1);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_empty_buffer_at_shutdown_issues_no_write() {
        let store = MemoryStore::new();
        let queue = Arc::new(IntakeQueue::new(8));
        let stats = Arc::new(IngestStats::new());
        let token = CancellationToken::new();
        token.cancel();

        let report = worker(&store, &queue, &stats, fast_settings(4, Duration::ZERO), &token).run();

        assert!(report.connected);
        assert!(!report.final_flush);
        assert_eq!(store.bulk_calls(), 0);
    }

    #[test]
    fn test_failed_write_clears_buffer_without_retry() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let queue = Arc::new(IntakeQueue::new(8));
        let stats = Arc::new(IngestStats::new());
        let token = CancellationToken::new();

        for i in 0..5 {
            queue.try_push(rec(i)).unwrap();
        }

        let w = worker(&store, &queue, &stats, fast_settings(5, Duration::from_secs(3600)), &token);
        let handle = thread::spawn(move || w.run());
        thread::sleep(Duration::from_millis(60));
        token.cancel();
        let report = handle.join().unwrap();

        assert_eq!(report.failed, 5);
        assert_eq!(report.written, 0);
        // One failed call; nothing left to retry at shutdown
        assert_eq!(store.bulk_calls(), 1);
        let snap = stats.snapshot();
        assert_eq!(snap.write_failed, 5);
        assert_eq!(snap.failed_flushes, 1);
    }

    #[test]
    fn test_partial_failure_counts_inserted() {
        let store = MemoryStore::new();
        store.reject_documents_with("bad");
        let queue = Arc::new(IntakeQueue::new(8));
        let stats = Arc::new(IngestStats::new());
        let token = CancellationToken::new();

        queue.try_push(rec(1)).unwrap();
        let mut bad = rec(2);
        bad.insert("bad", Value::Integer(1));
        queue.try_push(bad).unwrap();
        queue.try_push(rec(3)).unwrap();
        token.cancel();

        let report = worker(&store, &queue, &stats, fast_settings(64, Duration::from_secs(3600)), &token).run();

        assert_eq!(report.written, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_time_trigger_flushes_small_batch() {
        let store = MemoryStore::new();
        let queue = Arc::new(IntakeQueue::new(8));
        let stats = Arc::new(IngestStats::new());
        let token = CancellationToken::new();

        queue.try_push(rec(1)).unwrap();

        let w = worker(&store, &queue, &stats, fast_settings(64, Duration::from_millis(20)), &token);
        let handle = thread::spawn(move || w.run());
        thread::sleep(Duration::from_millis(150));

        assert_eq!(store.len(), 1);
        token.cancel();
        let report = handle.join().unwrap();
        assert!(!report.final_flush);
    }
}
