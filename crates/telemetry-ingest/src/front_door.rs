// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingestion front door.
//!
//! Receives one raw bus message at a time, parses it, stamps it and offers it
//! to the intake queue. Producers never block: a full queue drops the record.
//!
//! ```text
//! payload bytes --> utf-8 + trim --> size guard --> parse --> stamp, strip _id --> try_push
//! ```

use crate::parser;
use crate::queue::IntakeQueue;
use crate::record::ID_FIELD;
use crate::stats::IngestStats;
use crate::truncate;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Default maximum payload length, in characters.
pub const DEFAULT_MAX_PAYLOAD_CHARS: usize = 1024;

/// Maximum characters of payload echoed into log lines.
const LOG_DETAIL_CHARS: usize = 100;

/// What happened to a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Parsed and accepted into the intake queue.
    Queued,
    /// Payload was empty (after trimming).
    DroppedEmpty,
    /// Payload exceeded the size guard; never parsed.
    DroppedOversized,
    /// Payload was not UTF-8 or contained no `key=value` token.
    DroppedMalformed,
    /// Intake queue was full.
    DroppedOverflow,
}

impl IngestOutcome {
    pub fn is_queued(self) -> bool {
        self == IngestOutcome::Queued
    }
}

/// Producer-side entry point, cheap to clone across bus callbacks.
#[derive(Clone)]
pub struct FrontDoor {
    queue: Arc<IntakeQueue>,
    stats: Arc<IngestStats>,
    max_payload_chars: usize,
}

impl FrontDoor {
    pub fn new(queue: Arc<IntakeQueue>, stats: Arc<IngestStats>, max_payload_chars: usize) -> Self {
        Self {
            queue,
            stats,
            max_payload_chars,
        }
    }

    /// Handle one message delivered by the bus, stamped with the current time.
    pub fn on_message(&self, payload: &[u8], topic: &str) -> IngestOutcome {
        self.on_message_at(payload, topic, Utc::now())
    }

    /// Handle one message with an explicit capture time.
    pub fn on_message_at(&self, payload: &[u8], topic: &str, now: DateTime<Utc>) -> IngestOutcome {
        self.stats.record_offered();
        let outcome = self.admit(payload, topic, now);

        match outcome {
            IngestOutcome::Queued => self.stats.record_queued(),
            IngestOutcome::DroppedEmpty => self.stats.record_dropped_empty(),
            IngestOutcome::DroppedOversized => self.stats.record_dropped_oversized(),
            IngestOutcome::DroppedMalformed => self.stats.record_dropped_malformed(),
            IngestOutcome::DroppedOverflow => self.stats.record_dropped_overflow(),
        }
        outcome
    }

    fn admit(&self, payload: &[u8], topic: &str, now: DateTime<Utc>) -> IngestOutcome {
        let text = match std::str::from_utf8(payload) {
            Ok(text) => text.trim(),
            Err(e) => {
                tracing::debug!(topic, error = %e, "dropping non-utf8 payload");
                return IngestOutcome::DroppedMalformed;
            }
        };

        if text.is_empty() {
            return IngestOutcome::DroppedEmpty;
        }
        // Byte length bounds char count from above, so only count when needed
        if text.len() > self.max_payload_chars && text.chars().count() > self.max_payload_chars {
            tracing::debug!(topic, bytes = text.len(), "dropping oversized payload");
            return IngestOutcome::DroppedOversized;
        }

        let mut record = parser::parse(text);
        if record.is_empty() {
            tracing::debug!(
                topic,
                payload = %truncate(text, LOG_DETAIL_CHARS),
                "no key=value tokens in payload"
            );
            return IngestOutcome::DroppedMalformed;
        }

        record.stamp(now);
        record.remove(ID_FIELD);

        match self.queue.try_push(record) {
            Ok(()) => IngestOutcome::Queued,
            Err(_) => {
                let full = self.queue.full_count();
                if full == 1 || full % 1000 == 0 {
                    tracing::warn!(
                        topic,
                        capacity = self.queue.capacity(),
                        total_rejected = full,
                        "intake queue full, dropping record"
                    );
                } else {
                    tracing::debug!(topic, "intake queue full, dropping record");
                }
                IngestOutcome::DroppedOverflow
            }
        }
    }

    /// Intake queue this door feeds.
    pub fn queue(&self) -> &Arc<IntakeQueue> {
        &self.queue
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }
}
