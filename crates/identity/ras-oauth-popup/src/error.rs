//! Client-side error types.

use crate::storage::StorageError;
use ras_oauth_core::reason;
use thiserror::Error;

pub type PopupResult<T> = Result<T, PopupError>;

#[derive(Debug, Error)]
pub enum PopupError {
    #[error("Popup window could not be opened")]
    PopupBlocked,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The server refused the exchange; carries its reason code.
    #[error("Code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl PopupError {
    /// Text relayed to the opener in an `OAUTH_ERROR` message.
    pub fn message_reason(&self) -> String {
        match self {
            PopupError::ExchangeFailed(reason) => reason.clone(),
            _ => reason::OAUTH_CALLBACK_FAILED.to_string(),
        }
    }
}
