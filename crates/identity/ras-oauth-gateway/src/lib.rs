//! Server side of the popup OAuth2 authorization code flow.
//!
//! This crate exchanges authorization codes for access tokens exactly once
//! per code, resolves the authenticated profile through the provider's
//! userinfo endpoint, hands the token to a backend sink, and validates bearer
//! tokens by asking the provider whether it still accepts them. The
//! [`auth_router`] exposes both operations as `POST /api/auth/callback` and
//! `POST /api/auth/validate`.

mod config;
mod dedup;
mod error;
mod gateway;
mod identity;
mod provider;
mod routes;
mod sink;
mod validator;


pub use config::{
    ConfigIssue, GatewayConfig, ProviderCredentials, ProviderEndpoints, ResolvedCredentials,
    SinkConfig,
};
pub use dedup::{CodeDedupStore, InMemoryCodeStore};
pub use error::{GatewayError, GatewayResult, UpstreamStage};
pub use gateway::CodeExchangeGateway;
pub use identity::{CallerIdentityResolver, SessionCookieResolver};
pub use provider::{ProviderClient, TokenResponse, build_http_client};
pub use routes::{CALLBACK_PATH, GatewayState, VALIDATE_PATH, auth_router};
pub use sink::{HttpTokenSink, TokenSink};
pub use validator::ProviderTokenValidator;

// Re-export common types for convenience
pub use ras_oauth_core::{AuthErrorKind, ExchangeRequest, TokenBundle, TokenValidator, UserProfile};
