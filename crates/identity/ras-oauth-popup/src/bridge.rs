//! The callback page: turns the provider redirect into one message for the opener.

use crate::error::PopupResult;
use crate::window::CallbackWindow;
use async_trait::async_trait;
use ras_oauth_core::{OAuthMessage, TokenBundle, reason};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use url::Url;

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackQuery {
    pub fn from_url(url: &Url) -> Self {
        let mut query = Self::default();
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "code" => query.code = Some(value.into_owned()),
                "state" => query.state = Some(value.into_owned()),
                "error" => query.error = Some(value.into_owned()),
                _ => {}
            }
        }
        query
    }

    /// Parse a bare query string such as `code=abc&state=xyz`.
    pub fn from_query(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        Url::parse(&format!("http://callback.invalid/?{query}"))
            .map(|url| Self::from_url(&url))
            .unwrap_or_default()
    }
}

/// Server-side code exchange as seen from the callback page.
#[async_trait]
pub trait CodeExchangeClient: Send + Sync {
    async fn exchange(&self, code: &str, state: &str) -> PopupResult<TokenBundle>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeOutcome {
    /// This page load already ran; nothing was posted.
    AlreadyProcessed,
    /// The message relayed to the opener (or that would have been, if the
    /// opener was gone).
    Posted(OAuthMessage),
}

/// Runs once per callback page load.
pub struct CallbackBridge {
    exchange: Arc<dyn CodeExchangeClient>,
    window: Arc<dyn CallbackWindow>,
    processed: AtomicBool,
}

impl CallbackBridge {
    pub fn new(exchange: Arc<dyn CodeExchangeClient>, window: Arc<dyn CallbackWindow>) -> Self {
        Self {
            exchange,
            window,
            processed: AtomicBool::new(false),
        }
    }

    /// Handle the redirect. Posts exactly one [`OAuthMessage`] to the opener
    /// and closes the window; later calls do nothing.
    pub async fn run(&self, query: &CallbackQuery) -> BridgeOutcome {
        if self.processed.swap(true, Ordering::SeqCst) {
            return BridgeOutcome::AlreadyProcessed;
        }

        let message = self.resolve(query).await;
        self.post(&message);
        self.window.close();
        BridgeOutcome::Posted(message)
    }

    async fn resolve(&self, query: &CallbackQuery) -> OAuthMessage {
        if let Some(provider_error) = &query.error {
            warn!("Provider returned an error: {}", provider_error);
            return OAuthMessage::error(provider_error.clone());
        }

        let (Some(code), Some(state)) = (&query.code, &query.state) else {
            return OAuthMessage::error(reason::MISSING_CODE_OR_STATE);
        };

        match self.exchange.exchange(code, state).await {
            Ok(bundle) => {
                info!("Code exchange succeeded");
                OAuthMessage::success(bundle)
            }
            Err(e) => {
                error!("Code exchange failed: {}", e);
                OAuthMessage::error(e.message_reason())
            }
        }
    }

    fn post(&self, message: &OAuthMessage) {
        let Some(opener) = self.window.opener() else {
            warn!("No opener to notify; closing callback window");
            return;
        };

        // Target our own origin so nothing leaks to a foreign opener.
        if let Err(e) = opener.post_message(message, &self.window.origin()) {
            error!("Failed to post message to opener: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_from_url() {
        let url = Url::parse("http://localhost:3000/auth/callback?code=abc&state=xyz").unwrap();
        let query = CallbackQuery::from_url(&url);
        assert_eq!(query.code.as_deref(), Some("abc"));
        assert_eq!(query.state.as_deref(), Some("xyz"));
        assert_eq!(query.error, None);
    }

    #[test]
    fn test_empty_values_are_absent() {
        let query = CallbackQuery::from_query("?code=&state=xyz&error=");
        assert_eq!(query.code, None);
        assert_eq!(query.state.as_deref(), Some("xyz"));
        assert_eq!(query.error, None);
    }

    #[test]
    fn test_query_decodes_values() {
        let query = CallbackQuery::from_query("error=access_denied&error_description=User+declined");
        assert_eq!(query.error.as_deref(), Some("access_denied"));
    }
}
