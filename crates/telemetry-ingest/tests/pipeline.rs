// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// End-to-end pipeline behaviour against the in-memory store:
// accounting under concurrent load, shutdown drain, failure paths.

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use telemetry_ingest::{Config, IngestOutcome, IngestPipeline, MemoryStore};

fn config(workers: usize, queue_capacity: usize, bulk_size: usize, flush_ms: u64) -> Config {
    Config::builder()
        .workers(workers)
        .queue_capacity(queue_capacity)
        .bulk_size(bulk_size)
        .flush_interval(Duration::from_millis(flush_ms))
        .idle_interval(Duration::from_millis(1))
        .build()
}

#[test]
fn test_accounting_balances_under_concurrent_load() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 2000;

    let store = MemoryStore::new();
    // Slow store so the small queue overflows
    store.set_write_delay(Duration::from_millis(2));

    let mut pipeline = IngestPipeline::new(config(4, 50, 16, 10)).unwrap();
    pipeline.start(Arc::new(store.clone())).unwrap();

    let oversized = format!("blob={}", "x".repeat(1100));
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let door = pipeline.front_door();
            let oversized = oversized.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let payload = match i % 10 {
                        0 => String::new(),
                        1 => oversized.clone(),
                        2 => "no tokens here".to_string(),
                        _ => format!("producer={},seq={},temp=21.{}", p, i, i % 10),
                    };
                    door.on_message(payload.as_bytes(), "iot/testing");
                }
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }

    let summary = pipeline.shutdown();
    let stats = summary.stats;
    let total = (PRODUCERS * PER_PRODUCER) as u64;

    assert_eq!(stats.offered, total);
    assert_eq!(stats.dropped_empty, total / 10);
    assert_eq!(stats.dropped_oversized, total / 10);
    assert_eq!(stats.dropped_malformed, total / 10);
    assert_eq!(stats.queued + stats.dropped_overflow, total * 7 / 10);
    assert_eq!(stats.written, store.len() as u64);
    assert_eq!(stats.written, stats.queued);
    assert_eq!(stats.abandoned, 0);
    assert!(stats.is_balanced(), "unbalanced: {:?}", stats);
}

#[test]
fn test_shutdown_final_flush_per_worker() {
    let store = MemoryStore::new();
    // Neither trigger can fire before shutdown
    let mut pipeline = IngestPipeline::new(config(3, 100, 1000, 3_600_000)).unwrap();
    pipeline.start(Arc::new(store.clone())).unwrap();

    let door = pipeline.front_door();
    for i in 0..10 {
        assert_eq!(
            door.on_message(format!("n={}", i).as_bytes(), "t"),
            IngestOutcome::Queued
        );
    }
    thread::sleep(Duration::from_millis(50));
    assert!(store.is_empty());

    let summary = pipeline.shutdown();

    assert_eq!(store.len(), 10);
    let final_flushes = summary.workers.iter().filter(|w| w.final_flush).count();
    // One bulk call per worker that held records; none for empty buffers
    assert_eq!(final_flushes, store.bulk_calls());
    assert_eq!(store.batch_sizes().iter().sum::<usize>(), 10);
    for report in &summary.workers {
        assert_eq!(report.final_flush, report.written > 0);
        assert!(report.flushes <= 1);
    }
}

#[test]
fn test_id_field_never_reaches_store() {
    let store = MemoryStore::new();
    let mut pipeline = IngestPipeline::new(config(2, 100, 4, 10)).unwrap();
    pipeline.start(Arc::new(store.clone())).unwrap();

    let door = pipeline.front_door();
    door.on_message(b"a=1,_id=7,b=x", "t");
    door.on_message(b"_id=abc,c=2.5", "t");
    pipeline.shutdown();

    let docs = store.documents();
    assert_eq!(docs.len(), 2);
    for doc in &docs {
        assert!(!doc.contains_key("_id"));
        assert!(doc["timestamp"].is_string());
    }

    let first = docs
        .iter()
        .find(|d| d.contains_key("a"))
        .expect("document with field a");
    let keys: Vec<&str> = first.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["a", "b", "timestamp"]);
}

#[test]
fn test_all_workers_fail_to_connect() {
    let store = MemoryStore::new();
    store.set_fail_connect(true);

    let mut pipeline = IngestPipeline::new(config(3, 100, 4, 10)).unwrap();
    pipeline.start(Arc::new(store.clone())).unwrap();

    let door = pipeline.front_door();
    for i in 0..20 {
        door.on_message(format!("n={}", i).as_bytes(), "t");
    }

    let summary = pipeline.shutdown();

    assert!(summary.workers.iter().all(|w| !w.connected));
    assert_eq!(summary.stats.workers_failed, 3);
    assert_eq!(summary.stats.written, 0);
    assert_eq!(summary.stats.abandoned, 20);
    assert!(summary.stats.is_balanced());
}

#[test]
fn test_rejected_documents_are_counted_as_failed() {
    let store = MemoryStore::new();
    store.reject_documents_with("bad");

    let mut pipeline = IngestPipeline::new(config(2, 100, 8, 10)).unwrap();
    pipeline.start(Arc::new(store.clone())).unwrap();

    let door = pipeline.front_door();
    for i in 0..30 {
        let payload = if i % 3 == 0 {
            format!("n={},bad=1", i)
        } else {
            format!("n={}", i)
        };
        door.on_message(payload.as_bytes(), "t");
    }

    let summary = pipeline.shutdown();

    assert_eq!(summary.stats.write_failed, 10);
    assert_eq!(summary.stats.written, 20);
    assert_eq!(store.len(), 20);
    assert!(summary.stats.is_balanced());
}
