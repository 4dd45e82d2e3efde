// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The slice of the CloudWatch Logs API used for delivery.
//!
//! [`LogsApi`] is the seam between the delivery logic and the network;
//! [`CloudWatchLogsClient`] implements it on top of the AWS SDK.

use crate::config::DeliveryConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatchlogs::types;
use aws_sdk_cloudwatchlogs::Client;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLogEvent {
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutLogEventsRequest {
    pub log_group_name: String,
    pub log_stream_name: String,
    pub log_events: Vec<InputLogEvent>,
    /// Absent for the first append to a fresh stream.
    pub sequence_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectedLogEventsInfo {
    pub too_new_log_event_start_index: Option<i32>,
    pub too_old_log_event_end_index: Option<i32>,
    pub expired_log_event_end_index: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutLogEventsResponse {
    pub next_sequence_token: Option<String>,
    pub rejected_log_events_info: Option<RejectedLogEventsInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogStreamDescription {
    pub name: String,
    pub upload_sequence_token: Option<String>,
}

#[async_trait]
pub trait LogsApi: Send + Sync {
    async fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ApiError>;

    /// Whether a log group with exactly this name exists.
    async fn describe_log_group(&self, group: &str) -> Result<bool, ApiError>;

    /// The log stream with exactly this name, if it exists.
    async fn describe_log_stream(
        &self,
        group: &str,
        stream: &str,
    ) -> Result<Option<LogStreamDescription>, ApiError>;

    async fn create_log_group(&self, group: &str) -> Result<(), ApiError>;

    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct CloudWatchLogsClient {
    client: Client,
}

impl CloudWatchLogsClient {
    /// Builds an SDK client from the resolved configuration. The SDK's own
    /// retries are disabled: failed appends are retried by the host.
    pub async fn new(config: &DeliveryConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(config.credentials.clone())
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.timeout)
                    .build(),
            )
            .load()
            .await;

        let mut builder = aws_sdk_cloudwatchlogs::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            debug!("CLOUDWATCH | Using endpoint {endpoint}");
            builder = builder.endpoint_url(endpoint);
        }

        Self::from_client(Client::from_conf(builder.build()))
    }

    #[must_use]
    pub fn from_client(client: Client) -> Self {
        CloudWatchLogsClient { client }
    }
}

fn to_sdk_event(event: InputLogEvent) -> Result<types::InputLogEvent, ApiError> {
    types::InputLogEvent::builder()
        .message(event.message)
        .timestamp(event.timestamp)
        .build()
        .map_err(|e| ApiError::Transport(format!("invalid log event: {e}")))
}

#[async_trait]
impl LogsApi for CloudWatchLogsClient {
    #[allow(deprecated)]
    async fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ApiError> {
        let events = request
            .log_events
            .into_iter()
            .map(to_sdk_event)
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .put_log_events()
            .log_group_name(request.log_group_name)
            .log_stream_name(request.log_stream_name)
            .set_log_events(Some(events))
            .set_sequence_token(request.sequence_token)
            .send()
            .await?;

        let rejected = output
            .rejected_log_events_info()
            .map(|info| RejectedLogEventsInfo {
                too_new_log_event_start_index: info.too_new_log_event_start_index(),
                too_old_log_event_end_index: info.too_old_log_event_end_index(),
                expired_log_event_end_index: info.expired_log_event_end_index(),
            });
        if let Some(rejected) = &rejected {
            error!("CLOUDWATCH | Some log events were rejected: {rejected:?}");
        }

        Ok(PutLogEventsResponse {
            next_sequence_token: output.next_sequence_token().map(str::to_string),
            rejected_log_events_info: rejected,
        })
    }

    async fn describe_log_group(&self, group: &str) -> Result<bool, ApiError> {
        // The exact name sorts first among the names sharing it as a prefix,
        // so the first page is enough.
        let output = self
            .client
            .describe_log_groups()
            .log_group_name_prefix(group)
            .send()
            .await?;
        Ok(output
            .log_groups()
            .iter()
            .any(|g| g.log_group_name() == Some(group)))
    }

    #[allow(deprecated)]
    async fn describe_log_stream(
        &self,
        group: &str,
        stream: &str,
    ) -> Result<Option<LogStreamDescription>, ApiError> {
        let output = self
            .client
            .describe_log_streams()
            .log_group_name(group)
            .log_stream_name_prefix(stream)
            .send()
            .await?;
        Ok(output
            .log_streams()
            .iter()
            .find(|s| s.log_stream_name() == Some(stream))
            .map(|s| LogStreamDescription {
                name: stream.to_string(),
                upload_sequence_token: s.upload_sequence_token().map(str::to_string),
            }))
    }

    async fn create_log_group(&self, group: &str) -> Result<(), ApiError> {
        self.client
            .create_log_group()
            .log_group_name(group)
            .send()
            .await?;
        Ok(())
    }

    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), ApiError> {
        self.client
            .create_log_stream()
            .log_group_name(group)
            .log_stream_name(stream)
            .send()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_convert_to_sdk_shape() {
        let event = to_sdk_event(InputLogEvent {
            message: r#"{"k":"v"}"#.to_string(),
            timestamp: 1_552_212_672_000,
        })
        .unwrap();
        let expected = types::InputLogEvent::builder()
            .message(r#"{"k":"v"}"#)
            .timestamp(1_552_212_672_000)
            .build()
            .unwrap();
        assert_eq!(event, expected);
    }

    #[test]
    fn missing_token_response_is_default() {
        let response = PutLogEventsResponse::default();
        assert!(response.next_sequence_token.is_none());
        assert!(response.rejected_log_events_info.is_none());
    }
}
