// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch-level entry point used by the host.
//!
//! ```text
//!   start:  DeliveryConfig ──> provision ──> seed registry (remote token,
//!                                            then state file)
//!   flush:  for each record: serialize ──> deliver ──> next record
//!                               │ error        │ error
//!                               v              v
//!                           skip record    abort batch, Retry
//!
//!   a malformed record aborts the batch with Error
//! ```

use crate::client::{CloudWatchLogsClient, LogsApi};
use crate::config::{DeliveryConfig, RawOptions};
use crate::credentials::CredentialResolver;
use crate::delivery::DeliveryEngine;
use crate::error::ConfigError;
use crate::provisioner::{ProvisionReport, StreamProvisioner};
use crate::record::{to_json_line, DecodedRecord, RECORD_MALFORMED, RECORD_OK};
use crate::registry::{DestinationIdentity, SequenceRegistry};
use crate::token_store::TokenStore;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Result of one flush, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// Every record was delivered or skipped as unserializable.
    Ok,
    /// The batch holds input that can never be delivered; the host must
    /// not retry it.
    Error,
    /// A delivery failed; the whole batch should be submitted again.
    Retry,
}

pub struct LogsFlusher {
    identity: DestinationIdentity,
    engine: DeliveryEngine,
    provision_report: ProvisionReport,
}

impl LogsFlusher {
    /// Resolves the options, connects to the service and provisions the
    /// destination. Only configuration problems are fatal.
    pub async fn from_options(
        options: &RawOptions,
        resolver: &dyn CredentialResolver,
    ) -> Result<Self, ConfigError> {
        let config = DeliveryConfig::resolve(options, resolver).await?;
        info!(
            "CLOUDWATCH | Delivering to {} in {}",
            config.identity(),
            config.region
        );
        let api: Arc<dyn LogsApi> = Arc::new(CloudWatchLogsClient::new(&config).await);
        Ok(Self::start(&config, api, Arc::new(SequenceRegistry::new())).await)
    }

    /// Provisions the destination and seeds `registry` with the best known
    /// token. The remote token takes precedence over the state file because
    /// it reflects appends made by any writer.
    pub async fn start(
        config: &DeliveryConfig,
        api: Arc<dyn LogsApi>,
        registry: Arc<SequenceRegistry>,
    ) -> Self {
        let identity = config.identity();
        let token_store = TokenStore::new(&config.state_file);

        let provision_report =
            StreamProvisioner::new(Arc::clone(&api), Arc::clone(&registry), config.auto_create_stream)
                .provision(&identity)
                .await;

        let stored = token_store.load(&identity.stream).await;
        if registry.seed(&identity, stored).await {
            info!("CLOUDWATCH | Resuming {identity} from the token in the state file");
        }

        LogsFlusher {
            identity,
            engine: DeliveryEngine::new(api, registry, token_store),
            provision_report,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &DestinationIdentity {
        &self.identity
    }

    #[must_use]
    pub fn engine(&self) -> &DeliveryEngine {
        &self.engine
    }

    #[must_use]
    pub fn provision_report(&self) -> &ProvisionReport {
        &self.provision_report
    }

    /// Delivers records in order until the decoder signals the end of the
    /// batch. The first delivery failure stops the batch with `Retry`; a
    /// malformed record stops it with `Error`.
    pub async fn flush<I>(&self, records: I) -> FlushStatus
    where
        I: IntoIterator<Item = DecodedRecord>,
    {
        let mut delivered = 0usize;
        for record in records {
            match record.status {
                RECORD_OK => {}
                RECORD_MALFORMED => {
                    error!(
                        "CLOUDWATCH | malformed record after {delivered} records, dropping the batch"
                    );
                    return FlushStatus::Error;
                }
                _ => break,
            }

            let timestamp = record.timestamp.resolve();
            let line = match to_json_line(&record.fields) {
                Ok(line) => line,
                Err(e) => {
                    error!("CLOUDWATCH | error creating message for CloudWatch Logs: {e}");
                    continue;
                }
            };

            if let Err(e) = self.engine.deliver(&self.identity, line, timestamp).await {
                error!(
                    "CLOUDWATCH | error sending message to CloudWatch Logs after {delivered} records: {e}"
                );
                return FlushStatus::Retry;
            }
            delivered += 1;
        }

        debug!("CLOUDWATCH | Flushed {delivered} records to {}", self.identity);
        FlushStatus::Ok
    }
}
