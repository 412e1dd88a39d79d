//! Error taxonomy shared across the HTTP boundary.

use serde::{Deserialize, Serialize};

/// The four failure classes a caller of the auth routes can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthErrorKind {
    /// Missing or duplicate input supplied by the caller.
    BadRequest,
    /// Missing or malformed deployment configuration.
    ServerMisconfigured,
    /// The identity provider or the backend token sink failed.
    UpstreamError,
    /// The provider rejected a bearer token.
    ValidationFailure,
}

/// Stable reason codes carried in `{"error": ...}` response bodies.
pub mod reason {
    pub const MISSING_PARAMETERS: &str = "missing_parameters";
    pub const CODE_ALREADY_PROCESSED: &str = "code_already_processed";
    pub const CLIENT_ID_NOT_CONFIGURED: &str = "client_id_not_configured";
    pub const CLIENT_SECRET_NOT_CONFIGURED: &str = "client_secret_not_configured";
    pub const REDIRECT_URI_NOT_CONFIGURED: &str = "redirect_uri_not_configured";
    pub const INVALID_REDIRECT_URI: &str = "invalid_redirect_uri";
    pub const TOKEN_EXCHANGE_FAILED: &str = "token_exchange_failed";
    pub const USERINFO_FAILED: &str = "userinfo_failed";
    pub const SINK_FAILED: &str = "sink_failed";
    pub const MISSING_BEARER_TOKEN: &str = "missing_bearer_token";
    pub const TOKEN_INVALID: &str = "token_invalid";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const MISSING_CODE_OR_STATE: &str = "missing_code_or_state";
    pub const OAUTH_CALLBACK_FAILED: &str = "oauth_callback_failed";
    pub const SERVER_MISCONFIGURED: &str = "server_misconfigured";
}
