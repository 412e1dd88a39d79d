//! Authorization code exchange.

use crate::config::{GatewayConfig, ProviderCredentials};
use crate::dedup::{CodeDedupStore, InMemoryCodeStore};
use crate::error::{GatewayError, GatewayResult};
use crate::identity::{CallerIdentityResolver, SessionCookieResolver};
use crate::provider::{ProviderClient, build_http_client};
use crate::sink::{HttpTokenSink, TokenSink};
use axum::http::HeaderMap;
use ras_oauth_core::{ExchangeRequest, TokenBundle};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Turns an authorization code into `{accessToken, user}`.
///
/// Each code is exchanged at most once for as long as the dedup store
/// remembers it; the code is claimed before the provider is contacted, so a
/// failed exchange also consumes it.
#[derive(Clone)]
pub struct CodeExchangeGateway {
    credentials: ProviderCredentials,
    provider: ProviderClient,
    dedup: Arc<dyn CodeDedupStore>,
    sink: Arc<dyn TokenSink>,
    identity: Arc<dyn CallerIdentityResolver>,
}

impl CodeExchangeGateway {
    pub fn new(
        credentials: ProviderCredentials,
        provider: ProviderClient,
        dedup: Arc<dyn CodeDedupStore>,
        sink: Arc<dyn TokenSink>,
        identity: Arc<dyn CallerIdentityResolver>,
    ) -> Self {
        Self {
            credentials,
            provider,
            dedup,
            sink,
            identity,
        }
    }

    /// Build a gateway with the HTTP sink, cookie resolver and in-memory
    /// dedup store described by `config`.
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        let http_client = build_http_client(config.http_timeout())?;

        let mut dedup = InMemoryCodeStore::new();
        if let Some(ttl) = config.code_ttl_seconds {
            dedup = dedup.with_ttl(ttl)?;
        }
        if let Some(capacity) = config.code_capacity {
            dedup = dedup.with_capacity(capacity);
        }

        Ok(Self::new(
            config.credentials.clone(),
            ProviderClient::new(http_client.clone(), config.endpoints.clone()),
            Arc::new(dedup),
            Arc::new(HttpTokenSink::new(http_client, &config.sink)),
            Arc::new(SessionCookieResolver::new(
                config.session_cookie_name.clone(),
                config.user_id_prefix.clone(),
            )),
        ))
    }

    pub fn with_dedup_store(mut self, dedup: Arc<dyn CodeDedupStore>) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn TokenSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_identity_resolver(mut self, identity: Arc<dyn CallerIdentityResolver>) -> Self {
        self.identity = identity;
        self
    }

    pub fn provider(&self) -> &ProviderClient {
        &self.provider
    }

    /// Exchange `request.code` for a token bundle on behalf of the caller
    /// identified by `headers`.
    pub async fn exchange(
        &self,
        request: &ExchangeRequest,
        headers: &HeaderMap,
    ) -> GatewayResult<TokenBundle> {
        if request.code.is_empty() || request.state.is_empty() {
            return Err(GatewayError::MissingParameters);
        }

        let credentials = self.credentials.resolve().map_err(|issue| {
            error!("OAuth provider misconfigured: {}", issue);
            GatewayError::Misconfigured(issue)
        })?;

        if !self.dedup.try_claim(&request.code).await? {
            warn!("Rejected authorization code that was already processed");
            return Err(GatewayError::CodeAlreadyProcessed);
        }

        info!(
            "Exchanging code for token with redirect_uri: {}",
            credentials.redirect_uri
        );

        let tokens = self
            .provider
            .exchange_code(&credentials, &request.code)
            .await?;
        let user = self.provider.fetch_user_info(&tokens.access_token).await?;

        let user_id = self.identity.resolve(headers);
        self.sink.store(&user_id, &tokens.access_token).await?;

        info!("Completed code exchange for backend user {}", user_id);

        Ok(TokenBundle {
            access_token: tokens.access_token,
            user,
        })
    }
}
