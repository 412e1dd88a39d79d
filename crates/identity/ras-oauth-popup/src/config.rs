//! Public-facing configuration for building the authorize URL.

use crate::error::{PopupError, PopupResult};
use std::time::Duration;
use url::Url;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/auth/callback";
pub const DEFAULT_TENANT: &str = "common";
pub const DEFAULT_SCOPES: [&str; 3] = ["User.Read", "Mail.Read", "Calendars.Read"];
pub const POPUP_NAME: &str = "azure-oauth";
pub const POPUP_FEATURES: &str = "width=500,height=600,scrollbars=yes,resizable=yes";

#[derive(Debug, Clone)]
pub struct PopupConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub tenant: String,
    pub authority_host: String,
    pub scopes: Vec<String>,
    pub prompt: String,
    pub popup_name: String,
    pub popup_features: String,
    pub poll_interval: Duration,
}

impl PopupConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            tenant: DEFAULT_TENANT.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            prompt: "select_account".to_string(),
            popup_name: POPUP_NAME.to_string(),
            popup_features: POPUP_FEATURES.to_string(),
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut config = Self::new(get("PUBLIC_AZURE_CLIENT_ID").unwrap_or_default());
        if let Some(redirect_uri) = get("PUBLIC_REDIRECT_URI") {
            config.redirect_uri = redirect_uri;
        }
        if let Some(tenant) = get("PUBLIC_AZURE_TENANT_ID") {
            config.tenant = tenant;
        }
        config
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// `{authority_host}/{tenant}/oauth2/v2.0/authorize`
    pub fn authorize_endpoint(&self) -> PopupResult<Url> {
        let endpoint = format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.authority_host.trim_end_matches('/'),
            self.tenant
        );
        Ok(Url::parse(&endpoint)?)
    }

    pub fn validate(&self) -> PopupResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(PopupError::ConfigError("client id is not set".to_string()));
        }
        Url::parse(&self.redirect_uri)?;
        Ok(())
    }
}
