// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod batch;
mod config;
mod decoder;
mod logger;

use std::process;

use cloudwatch_logs::credentials::DefaultCredentialResolver;
use cloudwatch_logs::flusher::LogsFlusher;
use cloudwatch_logs::record::DecodedRecord;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::ForwarderConfig;

#[tokio::main]
pub async fn main() {
    let config = match ForwarderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("CW_LOGS | ERROR | Invalid forwarder configuration: {e}");
            process::exit(1);
        }
    };

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", config.log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .event_format(logger::Formatter)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let flusher = match LogsFlusher::from_options(&config.options, &DefaultCredentialResolver).await
    {
        Ok(flusher) => flusher,
        Err(e) => {
            error!("Error creating CloudWatch Logs delivery on startup: {e}");
            process::exit(1);
        }
    };

    let policy = config.retry_policy();
    let mut lines = BufReader::new(io::stdin()).split(b'\n');
    let mut batch: Vec<DecodedRecord> = Vec::with_capacity(config.batch_size);
    let mut forwarded = 0usize;

    loop {
        match lines.next_segment().await {
            Ok(Some(line)) => {
                if let Some(record) = decoder::decode_bytes(&line) {
                    batch.push(record);
                }
                if batch.len() >= config.batch_size {
                    forwarded += batch::flush_with_retry(&flusher, &policy, &batch).await;
                    batch.clear();
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Error reading input: {e}");
                break;
            }
        }
    }

    if !batch.is_empty() {
        forwarded += batch::flush_with_retry(&flusher, &policy, &batch).await;
    }

    info!("Input closed, forwarded {forwarded} records");
}
