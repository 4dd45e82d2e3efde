// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Decoded log records and their JSON form.

use crate::error::SerializeError;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// A single field value of a decoded record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
    /// Raw bytes; serialized as a string rather than base64.
    Bytes(Vec<u8>),
    Array(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Bytes(value)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    FieldValue::Unsigned(u)
                } else {
                    FieldValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => FieldValue::String(s),
            Value::Array(items) => FieldValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                FieldValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl FieldValue {
    fn to_json(&self, key: &str) -> Result<Value, SerializeError> {
        Ok(match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Integer(i) => Value::Number((*i).into()),
            FieldValue::Unsigned(u) => Value::Number((*u).into()),
            FieldValue::Float(f) => Value::Number(
                Number::from_f64(*f).ok_or_else(|| SerializeError::NonFiniteNumber(key.to_string()))?,
            ),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            FieldValue::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json(key))
                    .collect::<Result<_, _>>()?,
            ),
            FieldValue::Map(map) => Value::Object(to_json_map(map)?),
        })
    }
}

fn to_json_map(fields: &BTreeMap<String, FieldValue>) -> Result<Map<String, Value>, SerializeError> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), v.to_json(k)?)))
        .collect()
}

/// Serializes a record's fields into the JSON object sent as the log message.
pub fn to_json_line(fields: &BTreeMap<String, FieldValue>) -> Result<String, SerializeError> {
    Ok(serde_json::to_string(&Value::Object(to_json_map(fields)?))?)
}

/// Timestamp representations a host may attach to a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordTimestamp {
    Time(DateTime<Utc>),
    EpochSeconds(u64),
    Unknown,
}

impl RecordTimestamp {
    /// Unknown representations fall back to the current time.
    #[must_use]
    pub fn resolve(&self) -> DateTime<Utc> {
        match self {
            RecordTimestamp::Time(t) => *t,
            RecordTimestamp::EpochSeconds(secs) => i64::try_from(*secs)
                .ok()
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .unwrap_or_else(|| {
                    debug!("CLOUDWATCH | timestamp {secs} out of range. Use current time.");
                    Utc::now()
                }),
            RecordTimestamp::Unknown => {
                debug!("CLOUDWATCH | timestamp isn't known format. Use current time.");
                Utc::now()
            }
        }
    }
}

/// Host decoder status meaning a record was produced.
pub const RECORD_OK: i32 = 0;
/// The decoder ran out of input. Any status other than [`RECORD_OK`] and
/// [`RECORD_MALFORMED`] is read the same way.
pub const RECORD_END: i32 = -1;
/// The decoder hit input it cannot turn into a record; the batch is lost.
pub const RECORD_MALFORMED: i32 = -2;

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub status: i32,
    pub timestamp: RecordTimestamp,
    pub fields: BTreeMap<String, FieldValue>,
}

impl DecodedRecord {
    #[must_use]
    pub fn new(timestamp: RecordTimestamp, fields: BTreeMap<String, FieldValue>) -> Self {
        DecodedRecord {
            status: RECORD_OK,
            timestamp,
            fields,
        }
    }

    /// A record that terminates iteration.
    #[must_use]
    pub fn end_of_batch(status: i32) -> Self {
        DecodedRecord {
            status,
            timestamp: RecordTimestamp::Unknown,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn malformed() -> Self {
        Self::end_of_batch(RECORD_MALFORMED)
    }

    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.status == RECORD_MALFORMED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: Vec<(&str, FieldValue)>) -> BTreeMap<String, FieldValue> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn create_json() {
        let line = to_json_line(&fields(vec![
            ("key", "value".into()),
            ("number", 8i64.into()),
        ]))
        .unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["key"], "value");
        assert_eq!(parsed["number"], 8);
    }

    #[test]
    fn bytes_are_not_base64() {
        let line = to_json_line(&fields(vec![("log", b"hello".to_vec().into())])).unwrap();
        assert_eq!(line, r#"{"log":"hello"}"#);
    }

    #[test]
    fn nested_values() {
        let inner = fields(vec![("flag", true.into()), ("none", FieldValue::Null)]);
        let line = to_json_line(&fields(vec![
            ("inner", FieldValue::Map(inner)),
            (
                "list",
                FieldValue::Array(vec![FieldValue::Float(1.5), b"raw".to_vec().into()]),
            ),
        ]))
        .unwrap();
        assert_eq!(
            line,
            r#"{"inner":{"flag":true,"none":null},"list":[1.5,"raw"]}"#
        );
    }

    #[test]
    fn non_finite_float_is_error() {
        let err = to_json_line(&fields(vec![("bad", FieldValue::Float(f64::NAN))])).unwrap_err();
        assert!(matches!(err, SerializeError::NonFiniteNumber(key) if key == "bad"));
    }

    #[test]
    fn from_json_value() {
        let value: Value = serde_json::json!({"a": 1, "b": [true, null], "c": u64::MAX});
        match FieldValue::from(value) {
            FieldValue::Map(map) => {
                assert_eq!(map["a"], FieldValue::Integer(1));
                assert_eq!(
                    map["b"],
                    FieldValue::Array(vec![FieldValue::Bool(true), FieldValue::Null])
                );
                assert_eq!(map["c"], FieldValue::Unsigned(u64::MAX));
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn timestamp_resolution() {
        let ts = Utc.with_ymd_and_hms(2019, 3, 10, 10, 11, 12).unwrap();
        assert_eq!(RecordTimestamp::Time(ts).resolve(), ts);
        assert_eq!(
            RecordTimestamp::EpochSeconds(ts.timestamp() as u64).resolve(),
            ts
        );

        let before = Utc::now();
        let resolved = RecordTimestamp::Unknown.resolve();
        assert!(resolved >= before);
    }
}
