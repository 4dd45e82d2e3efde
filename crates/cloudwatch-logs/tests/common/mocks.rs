// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory stand-in for the CloudWatch Logs API

use async_trait::async_trait;
use cloudwatch_logs::client::{
    LogStreamDescription, LogsApi, PutLogEventsRequest, PutLogEventsResponse,
};
use cloudwatch_logs::error::ApiError;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Put(PutLogEventsRequest),
    DescribeGroup(String),
    DescribeStream(String, String),
    CreateGroup(String),
    CreateStream(String, String),
}

/// Records every call. Appends succeed with tokens `TOKEN-1`, `TOKEN-2`, ...
/// unless a scripted result is queued.
#[derive(Default)]
pub struct MockLogsApi {
    pub group_exists: bool,
    pub stream: Option<LogStreamDescription>,
    pub fail_creates: bool,
    calls: Mutex<Vec<Call>>,
    scripted: Mutex<VecDeque<Result<PutLogEventsResponse, ApiError>>>,
    issued: Mutex<usize>,
}

#[allow(dead_code)]
impl MockLogsApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing_stream(stream: &str, token: Option<&str>) -> Self {
        MockLogsApi {
            group_exists: true,
            stream: Some(LogStreamDescription {
                name: stream.to_string(),
                upload_sequence_token: token.map(str::to_string),
            }),
            ..Default::default()
        }
    }

    pub fn failing_creates() -> Self {
        MockLogsApi {
            fail_creates: true,
            ..Default::default()
        }
    }

    pub fn push_put_result(&self, result: Result<PutLogEventsResponse, ApiError>) {
        self.scripted.lock().unwrap().push_back(result);
    }

    pub fn push_token(&self, token: &str) {
        self.push_put_result(Ok(PutLogEventsResponse {
            next_sequence_token: Some(token.to_string()),
            rejected_log_events_info: None,
        }));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn puts(&self) -> Vec<PutLogEventsRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Put(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn create_result(&self) -> Result<(), ApiError> {
        if self.fail_creates {
            Err(service_error("AccessDeniedException", "not allowed"))
        } else {
            Ok(())
        }
    }
}

pub fn service_error(code: &str, message: &str) -> ApiError {
    ApiError::Service {
        status: 400,
        code: code.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl LogsApi for MockLogsApi {
    async fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ApiError> {
        self.record(Call::Put(request));
        if let Some(result) = self.scripted.lock().unwrap().pop_front() {
            return result;
        }
        let mut issued = self.issued.lock().unwrap();
        *issued += 1;
        Ok(PutLogEventsResponse {
            next_sequence_token: Some(format!("TOKEN-{issued}")),
            rejected_log_events_info: None,
        })
    }

    async fn describe_log_group(&self, group: &str) -> Result<bool, ApiError> {
        self.record(Call::DescribeGroup(group.to_string()));
        Ok(self.group_exists)
    }

    async fn describe_log_stream(
        &self,
        group: &str,
        stream: &str,
    ) -> Result<Option<LogStreamDescription>, ApiError> {
        self.record(Call::DescribeStream(group.to_string(), stream.to_string()));
        Ok(self.stream.clone().filter(|s| s.name == stream))
    }

    async fn create_log_group(&self, group: &str) -> Result<(), ApiError> {
        self.record(Call::CreateGroup(group.to_string()));
        self.create_result()
    }

    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), ApiError> {
        self.record(Call::CreateStream(group.to_string(), stream.to_string()));
        self.create_result()
    }
}
