// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Single-record appends with sequence token hand-off.
//!
//! Each append carries the token returned by the previous successful append
//! to the same destination, or no token at all for the first append to a
//! fresh stream. On success the returned token replaces the registry entry
//! and is mirrored to the [`TokenStore`]. On failure nothing changes, so a
//! retry of the same record reuses the same token.
//!
//! The engine does not retry on its own. Every failure is reported as
//! retryable and the caller decides when to resubmit.

use crate::client::{InputLogEvent, LogsApi, PutLogEventsRequest};
use crate::error::DeliveryError;
use crate::registry::{DestinationIdentity, SequenceRegistry, SequenceToken};
use crate::token_store::TokenStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error};

pub struct DeliveryEngine {
    api: Arc<dyn LogsApi>,
    registry: Arc<SequenceRegistry>,
    token_store: TokenStore,
}

impl DeliveryEngine {
    #[must_use]
    pub fn new(
        api: Arc<dyn LogsApi>,
        registry: Arc<SequenceRegistry>,
        token_store: TokenStore,
    ) -> Self {
        DeliveryEngine {
            api,
            registry,
            token_store,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SequenceRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn token_store(&self) -> &TokenStore {
        &self.token_store
    }

    /// Appends `payload` to `identity` and returns the stream's new token.
    ///
    /// The destination's registry entry stays locked for the whole call, so
    /// concurrent deliveries to one destination are applied in turn.
    pub async fn deliver(
        &self,
        identity: &DestinationIdentity,
        payload: String,
        timestamp: DateTime<Utc>,
    ) -> Result<SequenceToken, DeliveryError> {
        let slot = self.registry.entry(identity);
        let mut current = slot.lock().await;

        let request = PutLogEventsRequest {
            log_group_name: identity.group.clone(),
            log_stream_name: identity.stream.clone(),
            log_events: vec![InputLogEvent {
                message: payload,
                timestamp: timestamp.timestamp_millis(),
            }],
            sequence_token: current.as_request_field(),
        };

        let response = match self.api.put_log_events(request).await {
            Ok(response) => response,
            Err(e) => {
                match e.code() {
                    Some(code) => error!("CLOUDWATCH | Error: {code} sending to {identity}: {e}"),
                    None => error!("CLOUDWATCH | Fatal: sending to {identity}: {e}"),
                }
                return Err(e.into());
            }
        };

        let Some(next) = response
            .next_sequence_token
            .filter(|token| !token.is_empty())
            .map(SequenceToken::new)
        else {
            error!(
                "CLOUDWATCH | Append to {identity} returned no next sequence token, keeping the current one"
            );
            return Err(DeliveryError::MissingSequenceToken);
        };

        debug!("CLOUDWATCH | Appended one event to {identity}");
        *current = next.clone();
        // Written under the slot lock so the file never falls behind the
        // registry when appends to one destination race.
        self.token_store.store(&identity.stream, &next).await;
        Ok(next)
    }
}
