//! Forwarding of access tokens to the backend that persists them.

use crate::config::SinkConfig;
use crate::error::{GatewayError, GatewayResult, UpstreamStage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Receives every access token the gateway obtains.
///
/// The rest of the system assumes a stored token is durable, so a failed store
/// fails the whole exchange.
#[async_trait]
pub trait TokenSink: Send + Sync {
    async fn store(&self, user_id: &str, access_token: &str) -> GatewayResult<()>;
}

#[derive(Serialize)]
struct StoreTokenRequest<'a> {
    user_id: &'a str,
    access_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct StoreTokenResponse {
    message: Option<String>,
}

/// Posts `{user_id, access_token}` to `{endpoint}/post_access_token_endpoint`
/// with the `X-API-Token` header.
#[derive(Clone)]
pub struct HttpTokenSink {
    http_client: Client,
    url: String,
    api_key: String,
}

impl HttpTokenSink {
    pub const PATH: &'static str = "post_access_token_endpoint";

    pub fn new(http_client: Client, config: &SinkConfig) -> Self {
        let url = format!(
            "{}/{}",
            config.endpoint_url.trim_end_matches('/'),
            Self::PATH
        );
        Self {
            http_client,
            url,
            api_key: config.api_key.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenSink for HttpTokenSink {
    async fn store(&self, user_id: &str, access_token: &str) -> GatewayResult<()> {
        let response = self
            .http_client
            .post(&self.url)
            .header("X-API-Token", &self.api_key)
            .json(&StoreTokenRequest {
                user_id,
                access_token,
            })
            .send()
            .await
            .map_err(|e| {
                error!("Error storing token for user {}: {}", user_id, e);
                GatewayError::upstream(UpstreamStage::Sink, None, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("");
            error!(
                "Failed to store token for user {}: {} {}",
                user_id,
                status.as_u16(),
                reason
            );
            return Err(GatewayError::upstream(
                UpstreamStage::Sink,
                Some(status.as_u16()),
                format!("{} {}", status.as_u16(), reason),
            ));
        }

        match response.json::<StoreTokenResponse>().await {
            Ok(StoreTokenResponse {
                message: Some(message),
            }) => info!("Token stored successfully for user {}: {}", user_id, message),
            Ok(_) => info!("Token stored successfully for user {}", user_id),
            Err(e) => debug!("Token sink acknowledged without a JSON body: {}", e),
        }

        Ok(())
    }
}
