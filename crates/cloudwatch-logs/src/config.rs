// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::credentials::{CredentialResolver, Credentials};
use crate::error::ConfigError;
use crate::registry::DestinationIdentity;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Option keys understood by [`RawOptions::from_lookup`].
pub mod keys {
    pub const CREDENTIAL: &str = "Credential";
    pub const ACCESS_KEY_ID: &str = "AccessKeyID";
    pub const SECRET_ACCESS_KEY: &str = "SecretAccessKey";
    pub const LOG_GROUP_NAME: &str = "LogGroupName";
    pub const LOG_STREAM_NAME: &str = "LogStreamName";
    pub const REGION: &str = "Region";
    pub const AUTO_CREATE_STREAM: &str = "AutoCreateStream";
    pub const STATE_FILE: &str = "StateFile";
    pub const ENDPOINT: &str = "Endpoint";
    pub const TIMEOUT: &str = "Timeout";
}

/// Plugin options exactly as the host hands them over: every value is a
/// string and a missing key is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOptions {
    pub credential: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub log_group_name: String,
    pub log_stream_name: String,
    pub region: String,
    pub auto_create_stream: String,
    pub state_file: String,
    pub endpoint: String,
    pub timeout: String,
}

impl RawOptions {
    /// Builds the options by asking the host for each key.
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        RawOptions {
            credential: lookup(keys::CREDENTIAL),
            access_key_id: lookup(keys::ACCESS_KEY_ID),
            secret_access_key: lookup(keys::SECRET_ACCESS_KEY),
            log_group_name: lookup(keys::LOG_GROUP_NAME),
            log_stream_name: lookup(keys::LOG_STREAM_NAME),
            region: lookup(keys::REGION),
            auto_create_stream: lookup(keys::AUTO_CREATE_STREAM),
            state_file: lookup(keys::STATE_FILE),
            endpoint: lookup(keys::ENDPOINT),
            timeout: lookup(keys::TIMEOUT),
        }
    }
}

/// Validated, immutable delivery settings.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub credentials: Credentials,
    pub log_group_name: String,
    pub log_stream_name: String,
    pub region: String,
    pub auto_create_stream: bool,
    /// Prefix of the token state file. Empty disables persistence.
    pub state_file: String,
    /// Overrides the regional service endpoint.
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl DeliveryConfig {
    pub async fn resolve(
        options: &RawOptions,
        resolver: &dyn CredentialResolver,
    ) -> Result<Self, ConfigError> {
        let credentials = resolver
            .resolve(
                &options.access_key_id,
                &options.secret_access_key,
                &options.credential,
            )
            .await?;

        if options.log_group_name.is_empty() {
            return Err(ConfigError::EmptyField("logGroupName"));
        }
        if options.log_stream_name.is_empty() {
            return Err(ConfigError::EmptyField("logStreamName"));
        }
        if options.region.is_empty() {
            return Err(ConfigError::EmptyField("region"));
        }

        let timeout = if options.timeout.is_empty() {
            DEFAULT_TIMEOUT
        } else {
            options
                .timeout
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| {
                    ConfigError::Invalid(format!(
                        "Timeout must be a number of seconds, got '{}'",
                        options.timeout
                    ))
                })?
        };

        let config = DeliveryConfig {
            credentials,
            log_group_name: options.log_group_name.clone(),
            log_stream_name: options.log_stream_name.clone(),
            region: options.region.clone(),
            auto_create_stream: parse_auto_create(&options.auto_create_stream),
            state_file: options.state_file.clone(),
            endpoint: Some(options.endpoint.trim_end_matches('/'))
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            timeout,
        };
        debug!("CLOUDWATCH | Resolved configuration: {config:?}");
        Ok(config)
    }

    #[must_use]
    pub fn identity(&self) -> DestinationIdentity {
        DestinationIdentity::new(&self.log_group_name, &self.log_stream_name)
    }

    #[must_use]
    pub fn persistence_enabled(&self) -> bool {
        !self.state_file.is_empty()
    }
}

/// Empty or unrecognised values enable auto-creation.
#[must_use]
pub fn parse_auto_create(value: &str) -> bool {
    parse_bool(value).unwrap_or(true)
}

/// Accepts the same spellings as Go's `strconv.ParseBool`.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
