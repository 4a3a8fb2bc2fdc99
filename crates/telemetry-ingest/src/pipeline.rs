// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingestion pipeline
//!
//! Owns the intake queue, the shared counters and the cancellation token.
//! Front doors are handed out to producers; the flush engine is started
//! against a store and stopped with [`IngestPipeline::shutdown`].
//!
//! # Shutdown order
//!
//! 1. cancel the token
//! 2. join every worker (each drains the queue and does its final flush)
//! 3. count anything still queued as abandoned
//!
//! Step 3 only finds records when no worker could reach the store. Producers
//! must stop offering messages before step 1 for the counters to balance.

use crate::config::{Config, ConfigError};
use crate::engine::FlushEngine;
use crate::front_door::FrontDoor;
use crate::queue::IntakeQueue;
use crate::stats::{IngestStats, StatsSnapshot};
use crate::store::DocumentStore;
use crate::worker::{FlushSettings, WorkerReport};
use std::io;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Final state returned by [`IngestPipeline::shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSummary {
    pub stats: StatsSnapshot,
    pub workers: Vec<WorkerReport>,
}

/// Ingestion pipeline
pub struct IngestPipeline {
    config: Config,
    settings: FlushSettings,
    queue: Arc<IntakeQueue>,
    stats: Arc<IngestStats>,
    token: CancellationToken,
    engine: Option<FlushEngine>,
}

impl IngestPipeline {
    /// Create a pipeline; nothing runs until [`start`](Self::start).
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let settings = config.flush_settings()?;

        Ok(Self {
            queue: Arc::new(IntakeQueue::new(config.intake.queue_capacity)),
            stats: Arc::new(IngestStats::new()),
            token: CancellationToken::new(),
            engine: None,
            settings,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Producer handle; clone freely.
    pub fn front_door(&self) -> FrontDoor {
        FrontDoor::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.stats),
            self.config.intake.max_payload_chars,
        )
    }

    /// Token cancelled at shutdown; sources may watch it.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn queue(&self) -> &Arc<IntakeQueue> {
        &self.queue
    }

    /// Current counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_some()
    }

    /// Spawn the flush workers against `store`.
    pub fn start(&mut self, store: Arc<dyn DocumentStore>) -> io::Result<()> {
        if self.engine.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "pipeline already started",
            ));
        }

        let engine = FlushEngine::start(
            self.config.flush.workers,
            Arc::clone(&self.queue),
            store,
            Arc::clone(&self.stats),
            self.settings,
            self.token.clone(),
        )?;

        tracing::info!(
            workers = engine.worker_count(),
            queue_capacity = self.queue.capacity(),
            bulk_size = self.settings.bulk_size,
            flush_interval_ms = self.settings.flush_interval.as_millis() as u64,
            "ingest pipeline started"
        );
        self.engine = Some(engine);
        Ok(())
    }

    /// Stop the workers and settle the counters.
    pub fn shutdown(mut self) -> ShutdownSummary {
        let workers = self.stop();
        let stats = self.stats.snapshot();

        if !stats.is_balanced() {
            tracing::warn!(
                offered = stats.offered,
                accounted = stats.accounted(),
                "counters do not balance; a producer was still running"
            );
        }
        tracing::info!(
            offered = stats.offered,
            written = stats.written,
            dropped = stats.dropped(),
            flushes = stats.flushes,
            "ingest pipeline stopped"
        );

        ShutdownSummary { stats, workers }
    }

    fn stop(&mut self) -> Vec<WorkerReport> {
        self.token.cancel();
        let workers = self.engine.take().map(FlushEngine::join).unwrap_or_default();

        let mut leftover = Vec::new();
        let abandoned = self.queue.drain_into(&mut leftover);
        if abandoned > 0 {
            tracing::warn!(abandoned, "records left in intake queue after all workers stopped");
            self.stats.record_abandoned(abandoned as u64);
        }

        workers
    }
}

impl Drop for IngestPipeline {
    fn drop(&mut self) {
        if self.engine.is_some() {
            self.stop();
        }
    }
}
