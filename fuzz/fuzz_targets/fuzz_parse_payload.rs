// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use telemetry_ingest::{FrontDoor, IngestStats, IntakeQueue};

fuzz_target!(|data: &[u8]| {
    // Parser is total: any UTF-8 input yields a record, never a panic
    if let Ok(text) = std::str::from_utf8(data) {
        let record = telemetry_ingest::parse(text);
        for (key, _) in record.fields() {
            assert!(text.contains(key));
        }
        let _ = record.into_document();
    }

    // Front door on raw bytes: exactly one outcome counted per message
    let stats = Arc::new(IngestStats::new());
    let door = FrontDoor::new(Arc::new(IntakeQueue::new(1)), Arc::clone(&stats), 1024);
    let outcome = door.on_message(data, "fuzz");
    let snap = stats.snapshot();
    assert_eq!(snap.offered, 1);
    assert_eq!(snap.queued, u64::from(outcome.is_queued()));
    assert_eq!(snap.accounted() + snap.queued, 1);
});
