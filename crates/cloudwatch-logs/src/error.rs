// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use aws_sdk_cloudwatchlogs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Errors raised while turning raw plugin options into a [`crate::config::DeliveryConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to create credentials: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("Cannot specify empty string to {0}")]
    EmptyField(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("[SharedCredentials] {path}: {reason}")]
    SharedFile { path: String, reason: String },

    #[error("[StaticCredentials] access key id and secret access key must both be set")]
    IncompleteStatic,

    #[error("[EnvCredentials] {0}")]
    Environment(String),
}

/// Failure of a single call to the remote log service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service answered with an error document.
    #[error("{status}: {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a body that could not be read.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The short AWS error type, e.g. `InvalidSequenceTokenException`.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        self.code() == Some("ResourceAlreadyExistsException")
    }

    #[must_use]
    pub fn is_service_error(&self) -> bool {
        matches!(self, ApiError::Service { .. })
    }
}

impl<E> From<SdkError<E>> for ApiError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    fn from(err: SdkError<E>) -> Self {
        match &err {
            SdkError::ServiceError(service) => ApiError::Service {
                status: service.raw().status().as_u16(),
                code: err.code().unwrap_or("Unknown").to_string(),
                message: err.message().unwrap_or_default().to_string(),
            },
            SdkError::ResponseError(_) => {
                ApiError::Decode(DisplayErrorContext(&err).to_string())
            }
            _ => ApiError::Transport(DisplayErrorContext(&err).to_string()),
        }
    }
}

/// Outcome of a failed append. Every variant is retryable: the registry is
/// left untouched so a retried record reuses the same token.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("append rejected by service: {0}")]
    Rejected(ApiError),

    #[error("append failed: {0}")]
    Transport(ApiError),

    #[error("append response carried no next sequence token")]
    MissingSequenceToken,
}

impl DeliveryError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        true
    }
}

impl From<ApiError> for DeliveryError {
    fn from(err: ApiError) -> Self {
        if err.is_service_error() {
            DeliveryError::Rejected(err)
        } else {
            DeliveryError::Transport(err)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("field {0} holds a non-finite number")]
    NonFiniteNumber(String),

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ConfigError::EmptyField("logStreamName");
        assert_eq!(
            error.to_string(),
            "Cannot specify empty string to logStreamName"
        );
    }

    #[test]
    fn test_service_error_classification() {
        let err = ApiError::Service {
            status: 400,
            code: "InvalidSequenceTokenException".to_string(),
            message: "The given sequenceToken is invalid".to_string(),
        };
        assert_eq!(err.code(), Some("InvalidSequenceTokenException"));
        assert!(matches!(
            DeliveryError::from(err),
            DeliveryError::Rejected(_)
        ));

        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(err.code(), None);
        let delivery = DeliveryError::from(err);
        assert!(matches!(delivery, DeliveryError::Transport(_)));
        assert!(delivery.is_retryable());
    }

    #[test]
    fn test_already_exists() {
        let err = ApiError::Service {
            status: 400,
            code: "ResourceAlreadyExistsException".to_string(),
            message: "The specified log group already exists".to_string(),
        };
        assert!(err.is_already_exists());
    }
}
