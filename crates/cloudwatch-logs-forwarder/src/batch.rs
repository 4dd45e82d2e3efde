// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded resubmission of whole batches.

use std::time::Duration;

use cloudwatch_logs::flusher::{FlushStatus, LogsFlusher};
use cloudwatch_logs::record::DecodedRecord;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per batch, the first one included.
    pub max_attempts: u32,
    /// Pause before each resubmission.
    pub interval: Duration,
}

/// Submits `batch` from its first record until it is accepted or the
/// attempt budget runs out. Returns how many records were accepted, which is
/// zero for a dropped batch.
pub async fn flush_with_retry(
    flusher: &LogsFlusher,
    policy: &RetryPolicy,
    batch: &[DecodedRecord],
) -> usize {
    for attempt in 1..=policy.max_attempts {
        match flusher.flush(batch.iter().cloned()).await {
            FlushStatus::Ok => return batch.len(),
            FlushStatus::Error => {
                error!(
                    "Dropping batch of {} records after an unrecoverable error",
                    batch.len()
                );
                return 0;
            }
            FlushStatus::Retry if attempt < policy.max_attempts => {
                warn!(
                    "Retrying batch of {} records in {:?} (attempt {attempt}/{})",
                    batch.len(),
                    policy.interval,
                    policy.max_attempts
                );
                tokio::time::sleep(policy.interval).await;
            }
            FlushStatus::Retry => {}
        }
    }

    error!(
        "Dropping batch of {} records after {} attempts",
        batch.len(),
        policy.max_attempts
    );
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cloudwatch_logs::client::{
        LogStreamDescription, LogsApi, PutLogEventsRequest, PutLogEventsResponse,
    };
    use cloudwatch_logs::config::DeliveryConfig;
    use cloudwatch_logs::credentials::Credentials;
    use cloudwatch_logs::error::ApiError;
    use cloudwatch_logs::record::{FieldValue, RecordTimestamp};
    use cloudwatch_logs::registry::SequenceRegistry;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// Fails the appends whose 1-based position satisfies `fails`.
    struct FlakyApi {
        fails: fn(usize) -> bool,
        puts: Mutex<Vec<PutLogEventsRequest>>,
    }

    impl FlakyApi {
        fn new(fails: fn(usize) -> bool) -> Arc<Self> {
            Arc::new(FlakyApi {
                fails,
                puts: Mutex::new(Vec::new()),
            })
        }

        fn puts(&self) -> Vec<PutLogEventsRequest> {
            self.puts.lock().unwrap().clone()
        }

        fn messages(&self) -> Vec<String> {
            self.puts()
                .into_iter()
                .map(|p| p.log_events[0].message.clone())
                .collect()
        }
    }

    #[async_trait]
    impl LogsApi for FlakyApi {
        async fn put_log_events(
            &self,
            request: PutLogEventsRequest,
        ) -> Result<PutLogEventsResponse, ApiError> {
            let mut puts = self.puts.lock().unwrap();
            puts.push(request);
            let n = puts.len();
            if (self.fails)(n) {
                return Err(ApiError::Transport("connection reset".to_string()));
            }
            Ok(PutLogEventsResponse {
                next_sequence_token: Some(format!("T{n}")),
                rejected_log_events_info: None,
            })
        }

        async fn describe_log_group(&self, _: &str) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn describe_log_stream(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Option<LogStreamDescription>, ApiError> {
            Ok(None)
        }

        async fn create_log_group(&self, _: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn create_log_stream(&self, _: &str, _: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            interval: Duration::from_millis(1),
        }
    }

    async fn flusher(api: &Arc<FlakyApi>) -> LogsFlusher {
        let config = DeliveryConfig {
            credentials: Credentials::new("AKID", "SECRET", None, None, "test"),
            log_group_name: "group".to_string(),
            log_stream_name: "stream".to_string(),
            region: "us-east-1".to_string(),
            auto_create_stream: false,
            state_file: String::new(),
            endpoint: None,
            timeout: Duration::from_secs(5),
        };
        LogsFlusher::start(
            &config,
            Arc::clone(api) as Arc<dyn LogsApi>,
            Arc::new(SequenceRegistry::new()),
        )
        .await
    }

    fn batch(len: i64) -> Vec<DecodedRecord> {
        (0..len)
            .map(|n| {
                let mut fields = BTreeMap::new();
                fields.insert("n".to_string(), FieldValue::Integer(n));
                DecodedRecord::new(RecordTimestamp::Unknown, fields)
            })
            .collect()
    }

    #[tokio::test]
    async fn retry_resubmits_whole_batch() {
        let api = FlakyApi::new(|n| n == 3);
        let flusher = flusher(&api).await;

        let accepted = flush_with_retry(&flusher, &policy(3), &batch(4)).await;

        assert_eq!(accepted, 4);
        let messages = api.messages();
        assert_eq!(messages.len(), 7);
        // Records already delivered before the failure are sent again.
        assert_eq!(
            messages[3..],
            [r#"{"n":0}"#, r#"{"n":1}"#, r#"{"n":2}"#, r#"{"n":3}"#]
        );
        assert_eq!(api.puts()[3].sequence_token.as_deref(), Some("T2"));
    }

    #[tokio::test]
    async fn batch_dropped_after_max_attempts() {
        let api = FlakyApi::new(|_| true);
        let flusher = flusher(&api).await;

        let accepted = flush_with_retry(&flusher, &policy(3), &batch(4)).await;

        assert_eq!(accepted, 0);
        assert_eq!(api.messages(), vec![r#"{"n":0}"#; 3]);
    }

    #[tokio::test]
    async fn malformed_batch_is_not_retried() {
        let api = FlakyApi::new(|_| false);
        let flusher = flusher(&api).await;
        let mut records = batch(2);
        records.push(DecodedRecord::malformed());

        let accepted = flush_with_retry(&flusher, &policy(3), &records).await;

        assert_eq!(accepted, 0);
        assert_eq!(api.puts().len(), 2);
    }
}
