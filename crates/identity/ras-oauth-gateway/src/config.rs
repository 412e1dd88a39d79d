//! Gateway configuration.

use crate::dedup::ttl_from_seconds;
use crate::error::{GatewayError, GatewayResult};
use ras_oauth_core::reason;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TOKEN_ENDPOINT: &str =
    "https://login.microsoftonline.com/common/oauth2/v2.0/token";
pub const DEFAULT_USERINFO_ENDPOINT: &str = "https://graph.microsoft.com/v1.0/me";
pub const DEFAULT_SINK_URL: &str = "http://localhost:5000";
pub const DEFAULT_SESSION_COOKIE: &str = "session_id";

/// A specific piece of provider configuration that is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    ClientIdMissing,
    ClientSecretMissing,
    RedirectUriMissing,
    RedirectUriInvalid(String),
}

impl ConfigIssue {
    pub fn reason(&self) -> &'static str {
        match self {
            ConfigIssue::ClientIdMissing => reason::CLIENT_ID_NOT_CONFIGURED,
            ConfigIssue::ClientSecretMissing => reason::CLIENT_SECRET_NOT_CONFIGURED,
            ConfigIssue::RedirectUriMissing => reason::REDIRECT_URI_NOT_CONFIGURED,
            ConfigIssue::RedirectUriInvalid(_) => reason::INVALID_REDIRECT_URI,
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::ClientIdMissing => f.write_str("client id is not set"),
            ConfigIssue::ClientSecretMissing => f.write_str("client secret is not set"),
            ConfigIssue::RedirectUriMissing => f.write_str("redirect URI is not set"),
            ConfigIssue::RedirectUriInvalid(value) => {
                write!(f, "redirect URI '{}' is not an absolute URL", value)
            }
        }
    }
}

/// Provider client credentials.
///
/// Each field may be absent at load time; [`ProviderCredentials::resolve`]
/// reports which one is missing when a code exchange is attempted.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

/// Credentials that passed [`ProviderCredentials::resolve`].
#[derive(Clone)]
pub struct ResolvedCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,
}

impl ProviderCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            redirect_uri: Some(redirect_uri.into()),
        }
    }

    /// Check presence of every field, in order, and parse the redirect URI.
    pub fn resolve(&self) -> Result<ResolvedCredentials, ConfigIssue> {
        let client_id = non_empty(&self.client_id).ok_or(ConfigIssue::ClientIdMissing)?;
        let client_secret =
            non_empty(&self.client_secret).ok_or(ConfigIssue::ClientSecretMissing)?;
        let redirect_uri = non_empty(&self.redirect_uri).ok_or(ConfigIssue::RedirectUriMissing)?;

        // Url::parse only accepts absolute URLs.
        let redirect_uri = Url::parse(redirect_uri)
            .map_err(|_| ConfigIssue::RedirectUriInvalid(redirect_uri.to_string()))?;

        Ok(ResolvedCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri,
        })
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .finish()
    }
}

/// Identity provider endpoints used by the gateway.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            userinfo_endpoint: DEFAULT_USERINFO_ENDPOINT.to_string(),
        }
    }
}

/// Backend service that durably stores access tokens.
#[derive(Clone)]
pub struct SinkConfig {
    pub endpoint_url: String,
    pub api_key: String,
}

impl SinkConfig {
    pub fn new(endpoint_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub credentials: ProviderCredentials,
    pub endpoints: ProviderEndpoints,
    pub sink: SinkConfig,
    /// `None` means requests to the provider and sink never time out.
    pub http_timeout_seconds: Option<u64>,
    /// How long a consumed code is remembered. `None` keeps it for the
    /// process lifetime.
    pub code_ttl_seconds: Option<u64>,
    /// Upper bound on remembered codes. `None` is unbounded.
    pub code_capacity: Option<usize>,
    pub session_cookie_name: String,
    pub user_id_prefix: String,
}

impl GatewayConfig {
    pub fn new(credentials: ProviderCredentials, sink: SinkConfig) -> Self {
        Self {
            credentials,
            endpoints: ProviderEndpoints::default(),
            sink,
            http_timeout_seconds: None,
            code_ttl_seconds: None,
            code_capacity: None,
            session_cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            user_id_prefix: String::new(),
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> GatewayResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let credentials = ProviderCredentials {
            client_id: get("AZURE_CLIENT_ID"),
            client_secret: get("AZURE_CLIENT_SECRET"),
            redirect_uri: get("AZURE_REDIRECT_URI"),
        };

        let sink = SinkConfig {
            endpoint_url: get("ACCESS_TOKEN_ENDPOINT_URL")
                .unwrap_or_else(|| DEFAULT_SINK_URL.to_string()),
            api_key: get("ACCESS_TOKEN_API_KEY").ok_or_else(|| {
                GatewayError::ConfigError("ACCESS_TOKEN_API_KEY is required".to_string())
            })?,
        };

        let mut endpoints = ProviderEndpoints::default();
        if let Some(token_endpoint) = get("OAUTH_TOKEN_ENDPOINT") {
            endpoints.token_endpoint = token_endpoint;
        }
        if let Some(userinfo_endpoint) = get("OAUTH_USERINFO_ENDPOINT") {
            endpoints.userinfo_endpoint = userinfo_endpoint;
        }

        let mut config = Self::new(credentials, sink).with_endpoints(endpoints);
        config.http_timeout_seconds = parse_var(&get, "OAUTH_HTTP_TIMEOUT_SECS")?;
        config.code_ttl_seconds = parse_var(&get, "OAUTH_CODE_TTL_SECS")?;
        if let Some(ttl) = config.code_ttl_seconds {
            ttl_from_seconds(ttl)?;
        }
        config.code_capacity = parse_var(&get, "OAUTH_CODE_CAPACITY")?;
        if let Some(cookie) = get("SESSION_COOKIE_NAME") {
            config.session_cookie_name = cookie;
        }
        if let Some(prefix) = get("USER_ID_PREFIX") {
            config.user_id_prefix = prefix;
        }

        Ok(config)
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = Some(seconds);
        self
    }

    pub fn with_code_ttl(mut self, seconds: u64) -> Self {
        self.code_ttl_seconds = Some(seconds);
        self
    }

    pub fn with_code_capacity(mut self, capacity: usize) -> Self {
        self.code_capacity = Some(capacity);
        self
    }

    pub fn with_user_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_id_prefix = prefix.into();
        self
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_seconds.map(Duration::from_secs)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn parse_var<T, G>(get: &G, name: &str) -> GatewayResult<Option<T>>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| GatewayError::ConfigError(format!("{} must be a number", name)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_resolve_reports_first_missing_field() {
        let mut credentials = ProviderCredentials::default();
        assert_eq!(
            credentials.resolve().unwrap_err(),
            ConfigIssue::ClientIdMissing
        );

        credentials.client_id = Some("client".to_string());
        assert_eq!(
            credentials.resolve().unwrap_err(),
            ConfigIssue::ClientSecretMissing
        );

        credentials.client_secret = Some("secret".to_string());
        assert_eq!(
            credentials.resolve().unwrap_err(),
            ConfigIssue::RedirectUriMissing
        );

        credentials.redirect_uri = Some("/auth/callback".to_string());
        assert!(matches!(
            credentials.resolve(),
            Err(ConfigIssue::RedirectUriInvalid(_))
        ));

        credentials.redirect_uri = Some("http://localhost:3000/auth/callback".to_string());
        let resolved = credentials.resolve().unwrap();
        assert_eq!(resolved.redirect_uri.path(), "/auth/callback");
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("AZURE_CLIENT_ID", "client"),
            ("AZURE_CLIENT_SECRET", ""),
            ("ACCESS_TOKEN_API_KEY", "key"),
        ]))
        .unwrap();

        assert_eq!(config.credentials.client_id.as_deref(), Some("client"));
        assert!(config.credentials.client_secret.is_none());
        assert_eq!(config.sink.endpoint_url, DEFAULT_SINK_URL);
        assert_eq!(config.endpoints.userinfo_endpoint, DEFAULT_USERINFO_ENDPOINT);
        assert!(config.http_timeout().is_none());
        assert!(config.code_ttl_seconds.is_none());
        assert_eq!(config.session_cookie_name, DEFAULT_SESSION_COOKIE);
    }

    #[test]
    fn test_from_lookup_requires_sink_api_key() {
        let result = GatewayConfig::from_lookup(lookup(&[("AZURE_CLIENT_ID", "client")]));
        assert!(matches!(result, Err(GatewayError::ConfigError(_))));
    }

    #[test]
    fn test_from_lookup_rejects_non_numeric_bounds() {
        let result = GatewayConfig::from_lookup(lookup(&[
            ("ACCESS_TOKEN_API_KEY", "key"),
            ("OAUTH_CODE_CAPACITY", "lots"),
        ]));
        assert!(matches!(result, Err(GatewayError::ConfigError(_))));
    }

    #[test]
    fn test_from_lookup_rejects_out_of_range_ttl() {
        let result = GatewayConfig::from_lookup(lookup(&[
            ("ACCESS_TOKEN_API_KEY", "key"),
            ("OAUTH_CODE_TTL_SECS", "18446744073709551615"),
        ]));
        assert!(matches!(result, Err(GatewayError::ConfigError(_))));

        let config = GatewayConfig::from_lookup(lookup(&[
            ("ACCESS_TOKEN_API_KEY", "key"),
            ("OAUTH_CODE_TTL_SECS", "10000000000000"),
        ]))
        .unwrap();
        assert_eq!(config.code_ttl_seconds, Some(10_000_000_000_000));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = GatewayConfig::new(
            ProviderCredentials::new("client", "hunter2", "http://localhost/cb"),
            SinkConfig::new("http://sink", "sink-key"),
        );
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("sink-key"));
        assert!(rendered.contains("client"));
    }
}
