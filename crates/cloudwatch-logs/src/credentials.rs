// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! AWS credential resolution.
//!
//! Sources are tried in order: a shared credentials file named by the
//! `Credential` option, then an explicit access key pair, then the
//! `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` environment variables.
//! The first source that yields usable credentials wins.

use crate::error::CredentialsError;
use async_trait::async_trait;
use aws_config::environment::EnvironmentVariableCredentialsProvider;
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use tracing::{debug, error};

pub use aws_credential_types::Credentials;

pub const DEFAULT_PROFILE: &str = "default";
const STATIC_PROVIDER: &str = "CloudWatchLogsStatic";

/// Turns the credential-related plugin options into [`Credentials`].
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
        credential_file: &str,
    ) -> Result<Credentials, CredentialsError>;
}

/// Resolver backed by the AWS SDK providers for profile files and the
/// process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCredentialResolver;

#[async_trait]
impl CredentialResolver for DefaultCredentialResolver {
    async fn resolve(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
        credential_file: &str,
    ) -> Result<Credentials, CredentialsError> {
        let mut last_error = None;

        if !credential_file.is_empty() {
            match from_shared_file(credential_file).provide_credentials().await {
                Ok(creds) => {
                    debug!("CLOUDWATCH | Using shared credentials from {credential_file}");
                    return Ok(creds);
                }
                Err(e) => {
                    let e = CredentialsError::SharedFile {
                        path: credential_file.to_string(),
                        reason: DisplayErrorContext(&e).to_string(),
                    };
                    error!("CLOUDWATCH | {e}");
                    last_error = Some(e);
                }
            }
        }

        if !(access_key_id.is_empty() && secret_access_key.is_empty()) {
            match from_static(access_key_id, secret_access_key) {
                Ok(creds) => {
                    debug!("CLOUDWATCH | Using static credentials");
                    return Ok(creds);
                }
                Err(e) => {
                    error!("CLOUDWATCH | {e}");
                    last_error = Some(e);
                }
            }
        }

        match EnvironmentVariableCredentialsProvider::new()
            .provide_credentials()
            .await
        {
            Ok(creds) => {
                debug!("CLOUDWATCH | Using credentials from environment");
                Ok(creds)
            }
            Err(e) => {
                let e = CredentialsError::Environment(DisplayErrorContext(&e).to_string());
                error!("CLOUDWATCH | {e}");
                // Report the most specific failure the operator asked for.
                Err(last_error.unwrap_or(e))
            }
        }
    }
}

pub fn from_static(
    access_key_id: &str,
    secret_access_key: &str,
) -> Result<Credentials, CredentialsError> {
    if access_key_id.is_empty() || secret_access_key.is_empty() {
        return Err(CredentialsError::IncompleteStatic);
    }
    Ok(Credentials::new(
        access_key_id,
        secret_access_key,
        None,
        None,
        STATIC_PROVIDER,
    ))
}

/// Reads the `default` profile of the credentials file at `path` only,
/// ignoring `AWS_PROFILE` and the user's own `~/.aws` files.
#[must_use]
pub fn from_shared_file(path: &str) -> ProfileFileCredentialsProvider {
    let files = ProfileFiles::builder()
        .with_file(ProfileFileKind::Credentials, path)
        .build();
    ProfileFileCredentialsProvider::builder()
        .profile_files(files)
        .profile_name(DEFAULT_PROFILE)
        .build()
}
