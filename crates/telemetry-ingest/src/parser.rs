// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `key=value` payload parser.
//!
//! Payload format:
//! ```text
//! key1=value1,key2=value2,...
//! ```
//!
//! Parsing is total: malformed tokens are skipped and the result may be an
//! empty record, but it never fails.

use crate::record::{Record, Value};

/// Parse a comma-separated `key=value` payload into a record.
///
/// Each token is split at its first `=`; tokens without one are skipped.
/// Keys and values are trimmed, then each value is typed with [`classify`].
pub fn parse(payload: &str) -> Record {
    let mut record = Record::new();

    for token in payload.split(',') {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        record.insert(key.trim(), classify(value));
    }

    record
}

/// Classify a raw value.
///
/// Precedence:
/// 1. ASCII digits only -> `Integer`
/// 2. `-` followed by ASCII digits -> negative `Integer`
/// 3. contains `.` and parses as a finite float -> `Float`
/// 4. anything else -> `Text` (trimmed literal)
///
/// Digit runs that do not fit in an `i64` are not integers and end up as
/// `Text`.
pub fn classify(raw: &str) -> Value {
    let v = raw.trim();

    let integral = is_digits(v) || v.strip_prefix('-').is_some_and(is_digits);
    if integral {
        if let Ok(n) = v.parse::<i64>() {
            return Value::Integer(n);
        }
    }

    if v.contains('.') {
        if let Ok(f) = v.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
    }

    Value::Text(v.to_string())
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
