//! Gateway error types.

use crate::config::ConfigIssue;
use axum::http::StatusCode;
use ras_oauth_core::{AuthErrorKind, reason};
use std::fmt;
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Which upstream call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamStage {
    TokenExchange,
    UserInfo,
    Sink,
}

impl fmt::Display for UpstreamStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamStage::TokenExchange => f.write_str("token exchange"),
            UpstreamStage::UserInfo => f.write_str("userinfo request"),
            UpstreamStage::Sink => f.write_str("token sink"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing code or state parameter")]
    MissingParameters,

    #[error("Authorization code already processed")]
    CodeAlreadyProcessed,

    #[error("Server misconfigured: {0}")]
    Misconfigured(ConfigIssue),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("HTTP client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// `status` is `None` when the request never produced a response.
    #[error("{stage} failed: {detail}")]
    Upstream {
        stage: UpstreamStage,
        status: Option<u16>,
        detail: String,
    },

    #[error("No bearer token provided")]
    MissingBearerToken,

    #[error("Token rejected by provider with status {status}")]
    TokenRejected { status: u16 },

    #[error("Token validation unavailable: {0}")]
    ValidationUnavailable(String),
}

impl GatewayError {
    pub(crate) fn upstream(stage: UpstreamStage, status: Option<u16>, detail: impl Into<String>) -> Self {
        Self::Upstream {
            stage,
            status,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> AuthErrorKind {
        match self {
            GatewayError::MissingParameters | GatewayError::CodeAlreadyProcessed => {
                AuthErrorKind::BadRequest
            }
            GatewayError::Misconfigured(_)
            | GatewayError::ConfigError(_)
            | GatewayError::HttpClient(_) => AuthErrorKind::ServerMisconfigured,
            GatewayError::Upstream { .. } | GatewayError::ValidationUnavailable(_) => {
                AuthErrorKind::UpstreamError
            }
            GatewayError::MissingBearerToken | GatewayError::TokenRejected { .. } => {
                AuthErrorKind::ValidationFailure
            }
        }
    }

    /// Machine-readable reason code sent to callers. Never contains provider
    /// response text.
    pub fn reason(&self) -> &'static str {
        match self {
            GatewayError::MissingParameters => reason::MISSING_PARAMETERS,
            GatewayError::CodeAlreadyProcessed => reason::CODE_ALREADY_PROCESSED,
            GatewayError::Misconfigured(issue) => issue.reason(),
            GatewayError::ConfigError(_) | GatewayError::HttpClient(_) => {
                reason::SERVER_MISCONFIGURED
            }
            GatewayError::Upstream { stage, .. } => match stage {
                UpstreamStage::TokenExchange => reason::TOKEN_EXCHANGE_FAILED,
                UpstreamStage::UserInfo => reason::USERINFO_FAILED,
                UpstreamStage::Sink => reason::SINK_FAILED,
            },
            GatewayError::MissingBearerToken => reason::MISSING_BEARER_TOKEN,
            GatewayError::TokenRejected { .. } => reason::TOKEN_INVALID,
            GatewayError::ValidationUnavailable(_) => reason::VALIDATION_FAILED,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingParameters | GatewayError::CodeAlreadyProcessed => {
                StatusCode::BAD_REQUEST
            }
            // Provider answered and refused: the caller's code or token is bad.
            GatewayError::Upstream {
                stage: UpstreamStage::TokenExchange | UpstreamStage::UserInfo,
                status: Some(_),
                ..
            } => StatusCode::BAD_REQUEST,
            GatewayError::MissingBearerToken | GatewayError::TokenRejected { .. } => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::Misconfigured(_)
            | GatewayError::ConfigError(_)
            | GatewayError::HttpClient(_)
            | GatewayError::Upstream { .. }
            | GatewayError::ValidationUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_by_stage() {
        let exchange = GatewayError::upstream(UpstreamStage::TokenExchange, Some(400), "invalid_grant");
        assert_eq!(exchange.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(exchange.reason(), "token_exchange_failed");
        assert_eq!(exchange.kind(), AuthErrorKind::UpstreamError);

        let transport = GatewayError::upstream(UpstreamStage::TokenExchange, None, "connection refused");
        assert_eq!(transport.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let sink = GatewayError::upstream(UpstreamStage::Sink, Some(503), "unavailable");
        assert_eq!(sink.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sink.reason(), "sink_failed");
    }

    #[test]
    fn test_misconfiguration_reasons_are_distinct() {
        let reasons: Vec<_> = [
            ConfigIssue::ClientIdMissing,
            ConfigIssue::ClientSecretMissing,
            ConfigIssue::RedirectUriMissing,
            ConfigIssue::RedirectUriInvalid("not a url".to_string()),
        ]
        .into_iter()
        .map(|issue| GatewayError::Misconfigured(issue).reason())
        .collect();

        let unique: std::collections::HashSet<_> = reasons.iter().collect();
        assert_eq!(unique.len(), reasons.len());
    }

    #[test]
    fn test_validation_failures_are_unauthorized() {
        assert_eq!(
            GatewayError::TokenRejected { status: 401 }.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::MissingBearerToken.kind(),
            AuthErrorKind::ValidationFailure
        );
        assert_eq!(
            GatewayError::ValidationUnavailable("timeout".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
