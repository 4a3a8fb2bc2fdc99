// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Telemetry Ingest
//!
//! Turns a stream of `key=value` telemetry messages from a publish/subscribe
//! bus into batched bulk writes against a document store.
//!
//! # Features
//!
//! - **Total parser** -- `a=5,b=-3,c=2.5,d=hello` into typed fields, never fails
//! - **Bounded intake** -- lock-free queue, drops on overflow instead of blocking
//! - **Flush engine** -- N workers, one store session each, size/time triggers
//! - **Accounting** -- every offered message lands in exactly one counter
//!
//! # Architecture
//!
//! ```text
//! MessageSource --> FrontDoor --> parse --> IntakeQueue
//!                                                |
//!                          +---------------------+---------------------+
//!                          v                     v                     v
//!                    FlushWorker 0         FlushWorker 1   ...   FlushWorker N-1
//!                    (BatchBuffer)         (BatchBuffer)         (BatchBuffer)
//!                          |                     |                     |
//!                          +------> DocumentStore (bulk_write) <-------+
//! ```
//!
//! # Example
//!
//! ```ignore
//! use telemetry_ingest::{Config, IngestPipeline, MemoryStore};
//! use std::sync::Arc;
//!
//! let config = Config::builder().workers(4).bulk_size(32).build();
//! let mut pipeline = IngestPipeline::new(config)?;
//! pipeline.start(Arc::new(MemoryStore::new()))?;
//!
//! let door = pipeline.front_door();
//! door.on_message(b"temp=21.5,unit=C", "iot/testing");
//!
//! let summary = pipeline.shutdown();
//! assert!(summary.stats.is_balanced());
//! ```

pub mod buffer;
pub mod config;
pub mod engine;
pub mod filter;
pub mod front_door;
pub mod memory;
pub mod parser;
pub mod pipeline;
pub mod queue;
pub mod record;
pub mod source;
pub mod sqlite;
pub mod stats;
pub mod store;
pub mod worker;

pub use buffer::BatchBuffer;
pub use config::{Config, ConfigBuilder, ConfigError};
pub use engine::FlushEngine;
pub use filter::TopicFilter;
pub use front_door::{FrontDoor, IngestOutcome};
pub use memory::MemoryStore;
pub use parser::parse;
pub use pipeline::{IngestPipeline, ShutdownSummary};
pub use queue::IntakeQueue;
pub use record::{Document, Record, Value};
pub use source::{LineSource, MessageSource, SourceError, UdpSource};
pub use sqlite::{SqliteStore, StoredDocument};
pub use stats::{IngestStats, StatsSnapshot};
pub use store::{
    BulkWriteOptions, BulkWriteResult, DocumentStore, StoreError, StoreSession, WriteOp,
};
pub use worker::{FlushSettings, FlushWorker, WorkerReport, WorkerState};

/// Cut `s` to at most `max_chars` characters for log output.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 100), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        // Multi-byte characters are never split
        assert_eq!(truncate("ééééé", 2), "éé...");
        assert_eq!(truncate("", 0), "");
    }
}
