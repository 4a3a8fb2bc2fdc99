// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pipeline counters.
//!
//! Every message offered to the front door ends up in exactly one terminal
//! counter, which makes the accounting invariant checkable at shutdown:
//!
//! ```text
//! offered = written + write_failed + dropped_* + abandoned
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by the front door and all flush workers.
#[derive(Debug, Default)]
pub struct IngestStats {
    offered: AtomicU64,
    queued: AtomicU64,
    dropped_empty: AtomicU64,
    dropped_oversized: AtomicU64,
    dropped_malformed: AtomicU64,
    dropped_overflow: AtomicU64,
    written: AtomicU64,
    write_failed: AtomicU64,
    flushes: AtomicU64,
    failed_flushes: AtomicU64,
    abandoned: AtomicU64,
    workers_failed: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Messages handed to the front door
    pub offered: u64,
    /// Records accepted into the intake queue
    pub queued: u64,
    /// Empty payloads
    pub dropped_empty: u64,
    /// Payloads over the size guard
    pub dropped_oversized: u64,
    /// Payloads that were not UTF-8 or held no `key=value` token
    pub dropped_malformed: u64,
    /// Records rejected by a full intake queue
    pub dropped_overflow: u64,
    /// Records acknowledged by the store
    pub written: u64,
    /// Records lost to failed bulk writes
    pub write_failed: u64,
    /// Bulk write calls issued
    pub flushes: u64,
    /// Bulk write calls that returned an error
    pub failed_flushes: u64,
    /// Records still queued after every worker stopped
    pub abandoned: u64,
    /// Workers that never connected to the store
    pub workers_failed: u64,
}

impl StatsSnapshot {
    /// Sum of all terminal outcomes.
    pub fn accounted(&self) -> u64 {
        self.written
            + self.write_failed
            + self.dropped_empty
            + self.dropped_oversized
            + self.dropped_malformed
            + self.dropped_overflow
            + self.abandoned
    }

    /// Total records dropped for any reason.
    pub fn dropped(&self) -> u64 {
        self.dropped_empty
            + self.dropped_oversized
            + self.dropped_malformed
            + self.dropped_overflow
            + self.write_failed
            + self.abandoned
    }

    /// True once every offered message reached a terminal outcome.
    pub fn is_balanced(&self) -> bool {
        self.accounted() == self.offered
    }
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_offered(&self) {
        self.offered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_empty(&self) {
        self.dropped_empty.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_oversized(&self) {
        self.dropped_oversized.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_malformed(&self) {
        self.dropped_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_overflow(&self) {
        self.dropped_overflow.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self, written: u64, failed: u64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.written.fetch_add(written, Ordering::Relaxed);
        if failed > 0 {
            self.failed_flushes.fetch_add(1, Ordering::Relaxed);
            self.write_failed.fetch_add(failed, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_abandoned(&self, count: u64) {
        self.abandoned.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_worker_failed(&self) {
        self.workers_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            offered: self.offered.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            dropped_empty: self.dropped_empty.load(Ordering::Relaxed),
            dropped_oversized: self.dropped_oversized.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            dropped_overflow: self.dropped_overflow.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            write_failed: self.write_failed.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            workers_failed: self.workers_failed.load(Ordering::Relaxed),
        }
    }
}
