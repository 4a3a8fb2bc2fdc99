// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Document store abstraction
//!
//! Defines the traits for storage backends (SQLite, in-memory, ...).
//!
//! A [`DocumentStore`] is a shared factory; each flush worker opens its own
//! [`StoreSession`] with [`DocumentStore::connect`] and never shares it.

use crate::record::Document;
use thiserror::Error;

/// A single write directive inside a bulk operation.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert a new document; the store assigns its identity.
    InsertOne(Document),
}

/// Options for a bulk write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkWriteOptions {
    /// When false the store may reorder operations and keeps going past
    /// individual failures.
    pub ordered: bool,
}

impl BulkWriteOptions {
    pub fn unordered() -> Self {
        Self { ordered: false }
    }
}

impl Default for BulkWriteOptions {
    fn default() -> Self {
        Self { ordered: true }
    }
}

/// Outcome of a fully successful bulk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    pub inserted: u64,
    pub upserted: u64,
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connect failed: {0}")]
    Connect(String),

    /// Some operations of a bulk write failed; `inserted` of them succeeded.
    #[error("bulk write: {inserted} inserted, {failed} failed: {detail}")]
    BulkWrite {
        inserted: u64,
        failed: u64,
        detail: String,
    },

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Records of a batch of `batch_len` that made it into the store.
    pub fn inserted(&self, batch_len: u64) -> u64 {
        match self {
            StoreError::BulkWrite { inserted, .. } => (*inserted).min(batch_len),
            _ => 0,
        }
    }
}

/// Shared store handle used to open per-worker sessions.
pub trait DocumentStore: Send + Sync {
    /// Open a session owned by the calling worker.
    fn connect(&self) -> Result<Box<dyn StoreSession>, StoreError>;

    /// Human-readable target (for logs).
    fn describe(&self) -> String;
}

/// A connection/session owned by exactly one worker.
pub trait StoreSession: Send {
    /// Execute a bulk write.
    ///
    /// With `ordered: false` a failing operation does not stop the rest; the
    /// partial result is reported as [`StoreError::BulkWrite`].
    fn bulk_write(
        &mut self,
        ops: Vec<WriteOp>,
        options: BulkWriteOptions,
    ) -> Result<BulkWriteResult, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted_from_error() {
        let partial = StoreError::BulkWrite {
            inserted: 3,
            failed: 2,
            detail: "dup".to_string(),
        };
        assert_eq!(partial.inserted(5), 3);
        assert_eq!(StoreError::Backend("down".to_string()).inserted(5), 0);
    }

    #[test]
    fn test_bulk_write_options() {
        assert!(!BulkWriteOptions::unordered().ordered);
        assert!(BulkWriteOptions::default().ordered);
    }
}
