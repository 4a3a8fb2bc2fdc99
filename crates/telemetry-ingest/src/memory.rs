// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory document store.
//!
//! Keeps documents in a vector behind a mutex. Used by tests and by the
//! binary's `--mock` mode; failures can be injected to exercise the
//! worker's error paths.

use crate::record::Document;
use crate::store::{
    BulkWriteOptions, BulkWriteResult, DocumentStore, StoreError, StoreSession, WriteOp,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Inner {
    docs: Mutex<Vec<(u64, Document)>>,
    batch_sizes: Mutex<Vec<usize>>,
    reject_field: Mutex<Option<String>>,
    next_id: AtomicU64,
    sessions: AtomicU64,
    fail_connect: AtomicBool,
    fail_writes: AtomicBool,
    write_delay_ms: AtomicU64,
}

/// Shared in-memory store; clones see the same documents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `connect` fail.
    pub fn set_fail_connect(&self, fail: bool) {
        self.inner.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent bulk write fail as a whole.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Reject individual documents carrying `field` (partial bulk failure).
    pub fn reject_documents_with(&self, field: impl Into<String>) {
        *self.inner.reject_field.lock() = Some(field.into());
    }

    /// Delay each bulk write, simulating a slow backend.
    pub fn set_write_delay(&self, delay: Duration) {
        self.inner
            .write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Stored documents in insertion order.
    pub fn documents(&self) -> Vec<Document> {
        self.inner.docs.lock().iter().map(|(_, d)| d.clone()).collect()
    }

    /// Store-assigned identities in insertion order.
    pub fn ids(&self) -> Vec<u64> {
        self.inner.docs.lock().iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.docs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.docs.lock().is_empty()
    }

    /// Size of every bulk write received, including failed ones.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.inner.batch_sizes.lock().clone()
    }

    /// Number of bulk write calls received.
    pub fn bulk_calls(&self) -> usize {
        self.inner.batch_sizes.lock().len()
    }

    /// Number of sessions successfully opened.
    pub fn sessions(&self) -> u64 {
        self.inner.sessions.load(Ordering::SeqCst)
    }
}

impl DocumentStore for MemoryStore {
    fn connect(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        if self.inner.fail_connect.load(Ordering::SeqCst) {
            return Err(StoreError::Connect("memory store unavailable".to_string()));
        }
        self.inner.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            inner: Arc::clone(&self.inner),
        }))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

struct MemorySession {
    inner: Arc<Inner>,
}

impl StoreSession for MemorySession {
    fn bulk_write(
        &mut self,
        ops: Vec<WriteOp>,
        options: BulkWriteOptions,
    ) -> Result<BulkWriteResult, StoreError> {
        self.inner.batch_sizes.lock().push(ops.len());

        let delay = self.inner.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }

        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }

        let reject = self.inner.reject_field.lock().clone();
        let total = ops.len() as u64;
        let mut inserted = 0u64;
        let mut rejected = None;

        let mut docs = self.inner.docs.lock();
        for op in ops {
            let WriteOp::InsertOne(doc) = op;
            if let Some(field) = reject.as_deref().filter(|f| doc.contains_key(*f)) {
                rejected.get_or_insert_with(|| format!("document rejected: has field {:?}", field));
                if options.ordered {
                    break;
                }
                continue;
            }
            let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            docs.push((id, doc));
            inserted += 1;
        }

        match rejected {
            None => Ok(BulkWriteResult {
                inserted,
                upserted: 0,
            }),
            Some(detail) => Err(StoreError::BulkWrite {
                inserted,
                failed: total - inserted,
                detail,
            }),
        }
    }
}
