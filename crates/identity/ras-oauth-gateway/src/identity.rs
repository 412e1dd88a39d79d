//! Resolution of the caller's own backend user id.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use uuid::Uuid;

/// Derives the backend user id a stored token is filed under.
pub trait CallerIdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> String;
}

/// Uses the caller's session cookie as the user id, prefixed with a
/// deployment-specific string. Callers without a session get a fresh id.
#[derive(Debug, Clone)]
pub struct SessionCookieResolver {
    cookie_name: String,
    prefix: String,
}

impl SessionCookieResolver {
    pub fn new(cookie_name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            prefix: prefix.into(),
        }
    }

    fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.cookie_name && !value.is_empty())
            .map(|(_, value)| value.to_string())
    }
}

impl CallerIdentityResolver for SessionCookieResolver {
    fn resolve(&self, headers: &HeaderMap) -> String {
        let session_id = self
            .session_id(headers)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        format!("{}{}", self.prefix, session_id)
    }
}
