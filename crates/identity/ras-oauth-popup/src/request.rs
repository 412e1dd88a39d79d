//! Authorization request construction.

use crate::config::PopupConfig;
use rand::Rng;
use rand::distributions::Alphanumeric;
use url::Url;

const STATE_LEN: usize = 13;

/// A fresh opaque `state` value.
///
/// Not cryptographically strong: `state` only correlates the callback with
/// the attempt and is never checked against where the request came from.
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// Parameters of one login attempt's authorize URL.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub state: String,
    pub response_type: String,
    pub response_mode: String,
    pub prompt: String,
}

impl AuthorizationRequest {
    pub fn new(config: &PopupConfig) -> Self {
        let mut scopes: Vec<String> = Vec::with_capacity(config.scopes.len());
        for scope in &config.scopes {
            if !scopes.contains(scope) {
                scopes.push(scope.clone());
            }
        }

        Self {
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes,
            state: generate_state(),
            response_type: "code".to_string(),
            response_mode: "query".to_string(),
            prompt: config.prompt.clone(),
        }
    }

    pub fn to_url(&self, authorize_endpoint: &Url) -> Url {
        let mut url = authorize_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", &self.response_type)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("response_mode", &self.response_mode)
            .append_pair("state", &self.state)
            .append_pair("prompt", &self.prompt);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_state_generation() {
        let first = generate_state();
        let second = generate_state();
        assert_eq!(first.len(), STATE_LEN);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_authorize_url_parameters() {
        let config = PopupConfig::new("test_client_id");
        let request = AuthorizationRequest::new(&config);
        let url = request.to_url(&config.authorize_endpoint().unwrap());

        assert_eq!(url.host_str(), Some("login.microsoftonline.com"));
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "test_client_id");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["redirect_uri"], "http://localhost:3000/auth/callback");
        assert_eq!(params["scope"], "User.Read Mail.Read Calendars.Read");
        assert_eq!(params["response_mode"], "query");
        assert_eq!(params["prompt"], "select_account");
        assert_eq!(params["state"], request.state);
    }

    #[test]
    fn test_duplicate_scopes_are_collapsed() {
        let mut config = PopupConfig::new("client");
        config.scopes = vec![
            "User.Read".to_string(),
            "Mail.Read".to_string(),
            "User.Read".to_string(),
        ];
        let request = AuthorizationRequest::new(&config);
        assert_eq!(request.scopes, vec!["User.Read", "Mail.Read"]);
    }
}
