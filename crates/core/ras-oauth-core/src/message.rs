//! The message that crosses the popup/opener boundary.

use crate::types::TokenBundle;
use serde::{Deserialize, Serialize};

/// Outcome relayed from the callback page to the window that opened it.
///
/// Exactly one of these is posted per callback page load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OAuthMessage {
    #[serde(rename = "OAUTH_SUCCESS")]
    Success { payload: TokenBundle },
    #[serde(rename = "OAUTH_ERROR")]
    Error { error: String },
}

/// Payload-free discriminant, handy for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthMessageKind {
    Success,
    Error,
}

impl OAuthMessage {
    pub fn success(payload: TokenBundle) -> Self {
        Self::Success { payload }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    pub fn kind(&self) -> OAuthMessageKind {
        match self {
            Self::Success { .. } => OAuthMessageKind::Success,
            Self::Error { .. } => OAuthMessageKind::Error,
        }
    }

    /// Interpret arbitrary message data; anything not shaped like an
    /// `OAuthMessage` yields `None`.
    pub fn from_data(data: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(data.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserProfile;

    #[test]
    fn test_message_wire_format() {
        let success = OAuthMessage::success(TokenBundle {
            access_token: "tok1".to_string(),
            user: serde_json::from_value(serde_json::json!({"id": "u1"})).unwrap(),
        });
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            serde_json::json!({
                "type": "OAUTH_SUCCESS",
                "payload": {"accessToken": "tok1", "user": {"id": "u1"}}
            })
        );

        let error = OAuthMessage::error("access_denied");
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            serde_json::json!({"type": "OAUTH_ERROR", "error": "access_denied"})
        );
    }

    #[test]
    fn test_from_data_ignores_foreign_messages() {
        assert!(OAuthMessage::from_data(&serde_json::json!({"type": "webpack-ok"})).is_none());
        assert!(OAuthMessage::from_data(&serde_json::json!("hello")).is_none());

        let parsed = OAuthMessage::from_data(&serde_json::json!({
            "type": "OAUTH_SUCCESS",
            "payload": {"accessToken": "t", "user": {}}
        }))
        .unwrap();
        assert_eq!(parsed.kind(), OAuthMessageKind::Success);
        if let OAuthMessage::Success { payload } = parsed {
            assert_eq!(payload.user, UserProfile::default());
        }
    }
}
