// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Makes sure the destination log group and stream exist before the first
//! append, and recovers the sequence token of a stream that already has
//! content.
//!
//! Every step checks for existence before creating, which avoids
//! `ResourceAlreadyExistsException` on restarts. Two processes provisioning
//! the same stream at once can still race between check and create; that
//! surfaces as a logged create failure and nothing more. Failures never stop
//! startup: the first append reports the real problem if the destination is
//! unusable.

use crate::client::LogsApi;
use crate::error::ApiError;
use crate::registry::{DestinationIdentity, SequenceRegistry, SequenceToken};
use std::sync::Arc;
use tracing::{debug, error, info};

/// What provisioning found out about the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub group_created: bool,
    pub stream_created: bool,
    /// Token recovered from an existing stream, if any.
    pub remote_token: Option<SequenceToken>,
}

pub struct StreamProvisioner {
    api: Arc<dyn LogsApi>,
    registry: Arc<SequenceRegistry>,
    auto_create: bool,
}

impl StreamProvisioner {
    #[must_use]
    pub fn new(api: Arc<dyn LogsApi>, registry: Arc<SequenceRegistry>, auto_create: bool) -> Self {
        StreamProvisioner {
            api,
            registry,
            auto_create,
        }
    }

    /// Without auto-creation the destination is assumed to be managed
    /// elsewhere and no remote call is made.
    pub async fn provision(&self, identity: &DestinationIdentity) -> ProvisionReport {
        let mut report = ProvisionReport::default();
        if !self.auto_create {
            debug!("CLOUDWATCH | Auto-create disabled, skipping provisioning of {identity}");
            return report;
        }

        report.group_created = self.ensure_group(&identity.group).await;

        match self
            .api
            .describe_log_stream(&identity.group, &identity.stream)
            .await
        {
            Ok(Some(existing)) => {
                let token = existing
                    .upload_sequence_token
                    .map(SequenceToken::new)
                    .filter(|t| !t.is_empty());
                if let Some(token) = token {
                    if self.registry.seed(identity, token.clone()).await {
                        info!("CLOUDWATCH | Resuming {identity} from its remote sequence token");
                    }
                    report.remote_token = Some(token);
                } else {
                    debug!("CLOUDWATCH | Log stream {identity} exists without a sequence token");
                }
            }
            Ok(None) => {
                report.stream_created = self.create_stream(identity).await;
            }
            Err(e) => {
                // The lookup may fail for reasons unrelated to existence, so
                // still try to create; an existing stream only yields a
                // logged conflict.
                error!("CLOUDWATCH | Failed to describe logStream {identity}: {e}");
                report.stream_created = self.create_stream(identity).await;
            }
        }

        report
    }

    async fn ensure_group(&self, group: &str) -> bool {
        match self.api.describe_log_group(group).await {
            Ok(true) => {
                debug!("CLOUDWATCH | Log group {group} already exists");
                return false;
            }
            Ok(false) => {}
            Err(e) => error!("CLOUDWATCH | Failed to describe logGroup {group}: {e}"),
        }

        match self.api.create_log_group(group).await {
            Ok(()) => {
                info!("CLOUDWATCH | Created log group {group}");
                true
            }
            Err(e) => {
                log_create_failure("logGroup", group, &e);
                false
            }
        }
    }

    async fn create_stream(&self, identity: &DestinationIdentity) -> bool {
        match self
            .api
            .create_log_stream(&identity.group, &identity.stream)
            .await
        {
            Ok(()) => {
                info!("CLOUDWATCH | Created log stream {identity}");
                true
            }
            Err(e) => {
                log_create_failure("logStream", &identity.to_string(), &e);
                false
            }
        }
    }
}

fn log_create_failure(kind: &str, name: &str, err: &ApiError) {
    if err.is_already_exists() {
        debug!("CLOUDWATCH | {kind} {name} was created concurrently: {err}");
    } else {
        error!("CLOUDWATCH | Failed to create {kind} {name}. error: {err}");
    }
}
