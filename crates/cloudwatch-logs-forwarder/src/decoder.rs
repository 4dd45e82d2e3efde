// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns newline-delimited JSON input into records.

use chrono::{DateTime, TimeZone, Utc};
use cloudwatch_logs::record::{DecodedRecord, FieldValue, RecordTimestamp};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Field holding the record's timestamp, removed from the payload once read.
pub const TIME_KEY: &str = "time";
/// Field wrapping input lines that are not JSON objects.
pub const LOG_KEY: &str = "log";

/// Input that is not UTF-8 becomes a malformed record, which fails its
/// batch.
#[must_use]
pub fn decode_bytes(line: &[u8]) -> Option<DecodedRecord> {
    match std::str::from_utf8(line) {
        Ok(line) => decode_line(line),
        Err(e) => {
            warn!("Input line is not valid UTF-8: {e}");
            Some(DecodedRecord::malformed())
        }
    }
}

/// Blank lines yield `None`.
#[must_use]
pub fn decode_line(line: &str) -> Option<DecodedRecord> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let mut fields: BTreeMap<String, FieldValue> = match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(map)) => map.into_iter().map(|(k, v)| (k, v.into())).collect(),
        _ => {
            let mut fields = BTreeMap::new();
            fields.insert(LOG_KEY.to_string(), FieldValue::String(line.to_string()));
            return Some(DecodedRecord::new(RecordTimestamp::Unknown, fields));
        }
    };

    let timestamp = fields
        .get(TIME_KEY)
        .map(parse_timestamp)
        .unwrap_or(RecordTimestamp::Unknown);
    if timestamp != RecordTimestamp::Unknown {
        fields.remove(TIME_KEY);
    }

    Some(DecodedRecord::new(timestamp, fields))
}

fn parse_timestamp(value: &FieldValue) -> RecordTimestamp {
    match value {
        FieldValue::Unsigned(secs) => RecordTimestamp::EpochSeconds(*secs),
        FieldValue::Integer(secs) => u64::try_from(*secs)
            .map(RecordTimestamp::EpochSeconds)
            .unwrap_or(RecordTimestamp::Unknown),
        FieldValue::Float(secs) if secs.is_finite() && *secs >= 0.0 => {
            let millis = (secs * 1000.0).round() as i64;
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(RecordTimestamp::Time)
                .unwrap_or(RecordTimestamp::Unknown)
        }
        FieldValue::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|t| RecordTimestamp::Time(t.with_timezone(&Utc)))
            .unwrap_or(RecordTimestamp::Unknown),
        _ => RecordTimestamp::Unknown,
    }
}
