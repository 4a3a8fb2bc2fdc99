// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flush engine: N workers on dedicated threads.
//!
//! Workers share the intake queue and the store factory but nothing else.
//! A hung store session stalls only the thread that owns it.

use crate::queue::IntakeQueue;
use crate::stats::IngestStats;
use crate::store::DocumentStore;
use crate::worker::{FlushSettings, FlushWorker, WorkerReport};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Handle on the running flush workers.
pub struct FlushEngine {
    handles: Vec<JoinHandle<WorkerReport>>,
}

impl FlushEngine {
    /// Spawn `workers` flush threads.
    ///
    /// If a thread cannot be spawned, the token is cancelled so the already
    /// started workers drain and exit, and the error is returned.
    pub fn start(
        workers: usize,
        queue: Arc<IntakeQueue>,
        store: Arc<dyn DocumentStore>,
        stats: Arc<IngestStats>,
        settings: FlushSettings,
        token: CancellationToken,
    ) -> io::Result<Self> {
        let mut handles = Vec::with_capacity(workers);

        for id in 0..workers {
            let worker = FlushWorker::new(
                id,
                Arc::clone(&queue),
                Arc::clone(&store),
                Arc::clone(&stats),
                settings,
                token.clone(),
            );

            let spawned = thread::Builder::new()
                .name(format!("flush-worker-{}", id))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    token.cancel();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!(workers, store = %store.describe(), "flush engine started");
        Ok(Self { handles })
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to stop.
    ///
    /// Cancel the token first, or this blocks forever.
    pub fn join(self) -> Vec<WorkerReport> {
        let mut reports = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.join() {
                Ok(report) => reports.push(report),
                Err(_) => tracing::error!("flush worker panicked"),
            }
        }
        reports
    }
}
