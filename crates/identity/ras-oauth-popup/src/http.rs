//! HTTP clients for the gateway's two routes.

use crate::bridge::CodeExchangeClient;
use crate::error::{PopupError, PopupResult};
use async_trait::async_trait;
use ras_oauth_core::{ErrorBody, ExchangeRequest, TokenBundle, TokenValidator, reason};
use reqwest::Client;
use tracing::{debug, error};
use url::Url;

const CALLBACK_PATH: &str = "api/auth/callback";
const VALIDATE_PATH: &str = "api/auth/validate";

fn join(base_url: &str, path: &str) -> PopupResult<Url> {
    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
    Ok(base.join(path)?)
}

/// Calls `POST /api/auth/callback` from the callback page.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    http_client: Client,
    callback_url: Url,
}

impl HttpGatewayClient {
    pub fn new(base_url: &str) -> PopupResult<Self> {
        Ok(Self {
            http_client: Client::new(),
            callback_url: join(base_url, CALLBACK_PATH)?,
        })
    }

    pub fn with_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }
}

#[async_trait]
impl CodeExchangeClient for HttpGatewayClient {
    async fn exchange(&self, code: &str, state: &str) -> PopupResult<TokenBundle> {
        let request = ExchangeRequest {
            code: code.to_string(),
            state: state.to_string(),
        };

        let response = self
            .http_client
            .post(self.callback_url.clone())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let reason = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| reason::OAUTH_CALLBACK_FAILED.to_string());
            error!("Code exchange rejected with {}: {}", status, reason);
            return Err(PopupError::ExchangeFailed(reason));
        }

        Ok(response.json::<TokenBundle>().await?)
    }
}

/// Calls `POST /api/auth/validate`; valid iff the server answers with success.
#[derive(Debug, Clone)]
pub struct HttpTokenValidator {
    http_client: Client,
    validate_url: Url,
}

impl HttpTokenValidator {
    pub fn new(base_url: &str) -> PopupResult<Self> {
        Ok(Self {
            http_client: Client::new(),
            validate_url: join(base_url, VALIDATE_PATH)?,
        })
    }

    pub fn with_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }
}

#[async_trait]
impl TokenValidator for HttpTokenValidator {
    async fn validate(&self, token: &str) -> bool {
        match self
            .http_client
            .post(self.validate_url.clone())
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) => {
                debug!("Token validation returned {}", response.status());
                response.status().is_success()
            }
            Err(e) => {
                error!("Token validation request failed: {}", e);
                false
            }
        }
    }
}
