//! HTTP client for the identity provider's token and userinfo endpoints.

use crate::config::{ProviderEndpoints, ResolvedCredentials};
use crate::error::{GatewayError, GatewayResult, UpstreamStage};
use ras_oauth_core::UserProfile;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// OAuth2 token endpoint response.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Build the shared HTTP client. Without a timeout, requests wait as long as
/// the upstream takes.
pub fn build_http_client(timeout: Option<Duration>) -> GatewayResult<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(GatewayError::HttpClient)
}

#[derive(Clone)]
pub struct ProviderClient {
    http_client: Client,
    endpoints: ProviderEndpoints,
}

impl ProviderClient {
    pub fn new(http_client: Client, endpoints: ProviderEndpoints) -> Self {
        Self {
            http_client,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        credentials: &ResolvedCredentials,
        code: &str,
    ) -> GatewayResult<TokenResponse> {
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", credentials.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http_client
            .post(&self.endpoints.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Token exchange request failed: {}", e);
                GatewayError::upstream(UpstreamStage::TokenExchange, None, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "Token exchange failed with status {}: {}",
                status.as_u16(),
                error_text
            );
            return Err(GatewayError::upstream(
                UpstreamStage::TokenExchange,
                Some(status.as_u16()),
                error_text,
            ));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            error!("Invalid token response: {}", e);
            GatewayError::upstream(UpstreamStage::TokenExchange, None, e.to_string())
        })?;

        info!("Successfully exchanged code for tokens");
        Ok(token_response)
    }

    /// Fetch the profile the access token belongs to.
    pub async fn fetch_user_info(&self, access_token: &str) -> GatewayResult<UserProfile> {
        let response = self
            .http_client
            .get(&self.endpoints.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                error!("User info request failed: {}", e);
                GatewayError::upstream(UpstreamStage::UserInfo, None, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "User info request failed with status {}: {}",
                status.as_u16(),
                error_text
            );
            return Err(GatewayError::upstream(
                UpstreamStage::UserInfo,
                Some(status.as_u16()),
                error_text,
            ));
        }

        let user_info: UserProfile = response.json().await.map_err(|e| {
            error!("Invalid user info response: {}", e);
            GatewayError::upstream(UpstreamStage::UserInfo, None, e.to_string())
        })?;

        debug!(
            "Successfully retrieved user info for subject: {}",
            user_info.id().unwrap_or("<unknown>")
        );
        Ok(user_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> ResolvedCredentials {
        crate::config::ProviderCredentials::new(
            "mock_client_id",
            "mock_secret",
            "http://localhost:3000/auth/callback",
        )
        .resolve()
        .unwrap()
    }

    async fn setup() -> (MockServer, ProviderClient) {
        let mock_server = MockServer::start().await;
        let endpoints = ProviderEndpoints {
            token_endpoint: format!("{}/token", mock_server.uri()),
            userinfo_endpoint: format!("{}/me", mock_server.uri()),
        };
        let client = ProviderClient::new(build_http_client(None).unwrap(), endpoints);
        (mock_server, client)
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form() {
        let (mock_server, client) = setup().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("client_secret=mock_secret"))
            .and(body_string_contains(
                "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok1",
                "token_type": "Bearer",
                "expires_in": 3599,
                "scope": "User.Read"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let tokens = client.exchange_code(&credentials(), "abc").await.unwrap();
        assert_eq!(tokens.access_token, "tok1");
        assert_eq!(tokens.expires_in, Some(3599));
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let (mock_server, client) = setup().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant"
            })))
            .mount(&mock_server)
            .await;

        let err = client.exchange_code(&credentials(), "abc").await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Upstream {
                stage: UpstreamStage::TokenExchange,
                status: Some(400),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_user_info_sends_bearer() {
        let (mock_server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("Authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "u1",
                "displayName": "Test User"
            })))
            .mount(&mock_server)
            .await;

        let user = client.fetch_user_info("tok1").await.unwrap();
        assert_eq!(user.id(), Some("u1"));
        assert_eq!(user.display_name(), Some("Test User"));
    }

    #[tokio::test]
    async fn test_fetch_user_info_malformed_body() {
        let (mock_server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let err = client.fetch_user_info("tok1").await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Upstream {
                stage: UpstreamStage::UserInfo,
                status: None,
                ..
            }
        ));
    }
}
