//! Wire types for the exchange and validation routes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity-provider profile object, kept verbatim.
///
/// Providers disagree on field names (`id` vs `sub`, `displayName` vs `name`,
/// `mail` vs `email`), so the raw object is preserved and the accessors below
/// look up the common aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Subject identifier (`id` for Microsoft Graph, `sub` for OpenID Connect).
    pub fn id(&self) -> Option<&str> {
        self.first_str(&["id", "sub"])
    }

    pub fn display_name(&self) -> Option<&str> {
        self.first_str(&["displayName", "name"])
    }

    pub fn email(&self) -> Option<&str> {
        self.first_str(&["mail", "email", "userPrincipalName"])
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.0
    }

    fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_str))
    }
}

impl From<Map<String, Value>> for UserProfile {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

/// Result of a successful code exchange: the bearer token and the profile it
/// resolved to.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBundle {
    pub access_token: String,
    pub user: UserProfile,
}

impl std::fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Body of `POST /api/auth/callback`.
///
/// Both fields default to empty so that a body missing either one reaches the
/// gateway's own parameter check instead of failing JSON extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

/// Body of `POST /api/auth/validate` responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidateResponse {
    pub fn valid(user: UserProfile) -> Self {
        Self {
            valid: true,
            user: Some(user),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            user: None,
            error: Some(error.into()),
        }
    }
}

/// Error body returned by the callback route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
