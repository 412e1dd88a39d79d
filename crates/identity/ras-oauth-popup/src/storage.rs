//! Persistent key/value storage for the opener's session.

use crate::error::PopupResult;
use dashmap::DashMap;
use ras_oauth_core::{TokenBundle, UserProfile};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub const ACCESS_TOKEN_KEY: &str = "azure_access_token";
pub const USER_KEY: &str = "azure_user";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// String key/value storage that outlives a page load.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str);
}

/// In-memory storage with an optional entry limit to simulate quota errors.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    items: DashMap<String, String>,
    max_entries: Option<usize>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail writes that would grow the storage past `max_entries` keys.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl SessionStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).map(|entry| entry.value().clone())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(max) = self.max_entries {
            if !self.items.contains_key(key) && self.items.len() >= max {
                return Err(StorageError::QuotaExceeded);
            }
        }
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.items.remove(key);
    }
}

/// The token/user pair as persisted in [`SessionStorage`].
///
/// Both keys are present or neither is; a half-written pair is treated as
/// no session and removed.
#[derive(Clone)]
pub struct PersistedSession {
    storage: Arc<dyn SessionStorage>,
}

impl PersistedSession {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> Option<TokenBundle> {
        let token = self.storage.get_item(ACCESS_TOKEN_KEY);
        let user = self.storage.get_item(USER_KEY);

        match (token, user) {
            (None, None) => None,
            (Some(access_token), Some(user)) => {
                match serde_json::from_str::<UserProfile>(&user) {
                    Ok(user) => Some(TokenBundle { access_token, user }),
                    Err(e) => {
                        warn!("Discarding stored session with unreadable user: {}", e);
                        self.clear();
                        None
                    }
                }
            }
            _ => {
                warn!("Discarding partially stored session");
                self.clear();
                None
            }
        }
    }

    /// Only the stored access token, without parsing the user.
    pub fn access_token(&self) -> Option<String> {
        self.storage.get_item(ACCESS_TOKEN_KEY)
    }

    pub fn save(&self, bundle: &TokenBundle) -> PopupResult<()> {
        let user = serde_json::to_string(&bundle.user)?;

        let written = self
            .storage
            .set_item(ACCESS_TOKEN_KEY, &bundle.access_token)
            .and_then(|_| self.storage.set_item(USER_KEY, &user));

        if let Err(e) = written {
            self.clear();
            return Err(e.into());
        }
        Ok(())
    }

    pub fn clear(&self) {
        self.storage.remove_item(ACCESS_TOKEN_KEY);
        self.storage.remove_item(USER_KEY);
    }
}
