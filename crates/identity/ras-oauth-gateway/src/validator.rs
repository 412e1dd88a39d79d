//! Bearer token validation against the provider.

use crate::error::{GatewayError, GatewayResult, UpstreamStage};
use crate::provider::ProviderClient;
use async_trait::async_trait;
use ras_oauth_core::{TokenValidator, UserProfile};
use tracing::{error, warn};

/// A token is valid iff the provider's userinfo endpoint accepts it right now.
#[derive(Clone)]
pub struct ProviderTokenValidator {
    provider: ProviderClient,
}

impl ProviderTokenValidator {
    pub fn new(provider: ProviderClient) -> Self {
        Self { provider }
    }

    /// Validate `token` and return the profile it resolves to.
    pub async fn validate_profile(&self, token: &str) -> GatewayResult<UserProfile> {
        if token.is_empty() {
            return Err(GatewayError::MissingBearerToken);
        }

        match self.provider.fetch_user_info(token).await {
            Ok(user) => Ok(user),
            Err(GatewayError::Upstream {
                stage: UpstreamStage::UserInfo,
                status: Some(status),
                ..
            }) => {
                warn!("Token validation failed: provider returned {}", status);
                Err(GatewayError::TokenRejected { status })
            }
            Err(e) => {
                error!("Token validation error: {}", e);
                Err(GatewayError::ValidationUnavailable(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl TokenValidator for ProviderTokenValidator {
    async fn validate(&self, token: &str) -> bool {
        self.validate_profile(token).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderEndpoints;
    use crate::provider::build_http_client;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, ProviderTokenValidator) {
        let mock_server = MockServer::start().await;
        let endpoints = ProviderEndpoints {
            token_endpoint: format!("{}/token", mock_server.uri()),
            userinfo_endpoint: format!("{}/me", mock_server.uri()),
        };
        let provider = ProviderClient::new(build_http_client(None).unwrap(), endpoints);
        (mock_server, ProviderTokenValidator::new(provider))
    }

    #[tokio::test]
    async fn test_validation_is_idempotent() {
        let (mock_server, validator) = setup().await;

        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("Authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "u1"})))
            .expect(2)
            .mount(&mock_server)
            .await;

        assert!(validator.validate("tok1").await);
        assert!(validator.validate("tok1").await);
    }

    #[tokio::test]
    async fn test_rejected_token_is_invalid() {
        let (mock_server, validator) = setup().await;

        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        assert!(!validator.validate("expired").await);
        assert!(matches!(
            validator.validate_profile("expired").await,
            Err(GatewayError::TokenRejected { status: 401 })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_invalid() {
        let endpoints = ProviderEndpoints {
            token_endpoint: "http://127.0.0.1:9/token".to_string(),
            userinfo_endpoint: "http://127.0.0.1:9/me".to_string(),
        };
        let provider = ProviderClient::new(build_http_client(None).unwrap(), endpoints);
        let validator = ProviderTokenValidator::new(provider);

        assert!(!validator.validate("tok1").await);
        assert!(matches!(
            validator.validate_profile("tok1").await,
            Err(GatewayError::ValidationUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_token_skips_provider() {
        let (mock_server, validator) = setup().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        assert!(matches!(
            validator.validate_profile("").await,
            Err(GatewayError::MissingBearerToken)
        ));
    }
}
