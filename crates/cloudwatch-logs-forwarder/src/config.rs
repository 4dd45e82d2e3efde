// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::batch::RetryPolicy;
use cloudwatch_logs::config::{keys, RawOptions};
use cloudwatch_logs::error::ConfigError;
use std::env;
use std::time::Duration;

/// Maps each plugin option to the environment variable that carries it.
pub const OPTION_ENV_VARS: [(&str, &str); 10] = [
    (keys::CREDENTIAL, "CW_CREDENTIAL"),
    (keys::ACCESS_KEY_ID, "CW_ACCESS_KEY_ID"),
    (keys::SECRET_ACCESS_KEY, "CW_SECRET_ACCESS_KEY"),
    (keys::LOG_GROUP_NAME, "CW_LOG_GROUP_NAME"),
    (keys::LOG_STREAM_NAME, "CW_LOG_STREAM_NAME"),
    (keys::REGION, "CW_REGION"),
    (keys::AUTO_CREATE_STREAM, "CW_AUTO_CREATE_STREAM"),
    (keys::STATE_FILE, "CW_STATE_FILE"),
    (keys::ENDPOINT, "CW_ENDPOINT"),
    (keys::TIMEOUT, "CW_TIMEOUT_SECS"),
];

/// Settings of the forwarder process itself.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Options handed to the delivery engine
    pub options: RawOptions,
    /// Records per flush
    pub batch_size: usize,
    /// Attempts per batch before it is dropped
    pub max_flush_attempts: u32,
    /// Pause between attempts of a batch that asked for a retry
    pub retry_interval: Duration,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            options: RawOptions::default(),
            batch_size: 100,
            max_flush_attempts: 5,
            retry_interval: Duration::from_millis(1000),
            log_level: "info".to_string(),
        }
    }
}

impl ForwarderConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let options = RawOptions::from_lookup(|key| {
            OPTION_ENV_VARS
                .iter()
                .find(|(option, _)| *option == key)
                .and_then(|(_, var)| env::var(var).ok())
                .unwrap_or_default()
        });
        let batch_size = env::var("CW_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.batch_size);
        let max_flush_attempts = env::var("CW_MAX_FLUSH_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.max_flush_attempts);
        let retry_interval = env::var("CW_RETRY_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_interval);
        let log_level = env::var("CW_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            options,
            batch_size,
            max_flush_attempts,
            retry_interval,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_flush_attempts,
            interval: self.retry_interval,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "CW_BATCH_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.max_flush_attempts == 0 {
            return Err(ConfigError::Invalid(
                "CW_MAX_FLUSH_ATTEMPTS must be greater than 0".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}
