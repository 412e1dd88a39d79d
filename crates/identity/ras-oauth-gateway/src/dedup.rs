//! One-shot tracking of consumed authorization codes.

use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Records which authorization codes have already been submitted.
///
/// A code is claimed *before* it is sent to the provider, so two concurrent
/// submissions of the same code cannot both reach the token endpoint.
#[async_trait]
pub trait CodeDedupStore: Send + Sync {
    /// Atomically record `code`. Returns `false` if it was already recorded.
    async fn try_claim(&self, code: &str) -> GatewayResult<bool>;

    /// Whether `code` is currently recorded.
    async fn contains(&self, code: &str) -> GatewayResult<bool>;

    /// Drop claims older than the store's TTL.
    async fn cleanup_expired(&self) -> GatewayResult<usize>;
}

/// In-memory implementation of CodeDedupStore.
///
/// Unbounded and kept for the process lifetime unless a TTL or capacity is
/// set. Claims are not shared between processes.
pub struct InMemoryCodeStore {
    codes: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    ttl: Option<Duration>,
    capacity: Option<usize>,
}

impl InMemoryCodeStore {
    pub fn new() -> Self {
        Self {
            codes: Arc::new(RwLock::new(HashMap::new())),
            ttl: None,
            capacity: None,
        }
    }

    /// Fails if `ttl_seconds` does not fit in a chrono duration.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> GatewayResult<Self> {
        self.ttl = Some(ttl_from_seconds(ttl_seconds)?);
        Ok(self)
    }

    /// Once full, the oldest claim is evicted to make room. An evicted code
    /// could be exchanged again, so size this well above the number of codes
    /// the provider keeps valid at once.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self
    }

    pub async fn len(&self) -> usize {
        self.codes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.codes.read().await.is_empty()
    }

    fn is_expired(&self, claimed_at: &DateTime<Utc>, now: DateTime<Utc>) -> bool {
        // A deadline past chrono's range never arrives.
        self.ttl.is_some_and(|ttl| {
            claimed_at
                .checked_add_signed(ttl)
                .is_some_and(|deadline| now > deadline)
        })
    }
}

pub(crate) fn ttl_from_seconds(seconds: u64) -> GatewayResult<Duration> {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| {
            GatewayError::ConfigError(format!("code TTL of {} seconds is out of range", seconds))
        })
}

impl Default for InMemoryCodeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeDedupStore for InMemoryCodeStore {
    async fn try_claim(&self, code: &str) -> GatewayResult<bool> {
        let mut codes = self.codes.write().await;
        let now = Utc::now();

        if let Some(claimed_at) = codes.get(code) {
            if !self.is_expired(claimed_at, now) {
                return Ok(false);
            }
        }

        if self.ttl.is_some() {
            codes.retain(|_, claimed_at| !self.is_expired(claimed_at, now));
        }

        if let Some(capacity) = self.capacity {
            while codes.len() >= capacity {
                let oldest = codes
                    .iter()
                    .min_by_key(|(_, claimed_at)| **claimed_at)
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(key) => {
                        codes.remove(&key);
                    }
                    None => break,
                }
            }
        }

        codes.insert(code.to_string(), now);
        Ok(true)
    }

    async fn contains(&self, code: &str) -> GatewayResult<bool> {
        let codes = self.codes.read().await;
        let now = Utc::now();
        Ok(codes
            .get(code)
            .is_some_and(|claimed_at| !self.is_expired(claimed_at, now)))
    }

    async fn cleanup_expired(&self) -> GatewayResult<usize> {
        let mut codes = self.codes.write().await;
        let now = Utc::now();
        let before = codes.len();
        codes.retain(|_, claimed_at| !self.is_expired(claimed_at, now));
        Ok(before - codes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_code_can_only_be_claimed_once() {
        let store = InMemoryCodeStore::new();

        assert!(store.try_claim("abc").await.unwrap());
        assert!(!store.try_claim("abc").await.unwrap());
        assert!(store.contains("abc").await.unwrap());

        // Other codes are unaffected
        assert!(store.try_claim("def").await.unwrap());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_claims_admit_exactly_one() {
        let store = Arc::new(InMemoryCodeStore::new());

        let mut handles = vec![];
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.try_claim("same-code").await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_unbounded_store_never_expires() {
        let store = InMemoryCodeStore::new();
        store.try_claim("abc").await.unwrap();
        store
            .codes
            .write()
            .await
            .insert("abc".to_string(), Utc::now() - Duration::days(365));

        assert_eq!(store.cleanup_expired().await.unwrap(), 0);
        assert!(!store.try_claim("abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_claims_are_released() {
        let store = InMemoryCodeStore::new().with_ttl(60).unwrap();
        store
            .codes
            .write()
            .await
            .insert("old".to_string(), Utc::now() - Duration::minutes(5));

        assert!(!store.contains("old").await.unwrap());
        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_claim() {
        let store = InMemoryCodeStore::new().with_capacity(2);
        store
            .codes
            .write()
            .await
            .insert("first".to_string(), Utc::now() - Duration::seconds(10));
        store.try_claim("second").await.unwrap();
        store.try_claim("third").await.unwrap();

        assert_eq!(store.len().await, 2);
        assert!(!store.contains("first").await.unwrap());
        assert!(store.contains("second").await.unwrap());
        assert!(store.contains("third").await.unwrap());
    }

    #[test]
    fn test_out_of_range_ttl_is_rejected() {
        let result = InMemoryCodeStore::new().with_ttl(u64::MAX / 2);
        assert!(matches!(result, Err(GatewayError::ConfigError(_))));
        assert!(ttl_from_seconds(u64::MAX).is_err());
    }

    #[tokio::test]
    async fn test_far_future_ttl_never_expires() {
        let store = InMemoryCodeStore::new()
            .with_ttl(10_000_000_000_000)
            .unwrap();

        assert!(store.try_claim("a").await.unwrap());
        assert!(store.try_claim("b").await.unwrap());
        assert!(!store.try_claim("a").await.unwrap());
        assert!(store.contains("b").await.unwrap());
        assert_eq!(store.cleanup_expired().await.unwrap(), 0);
    }
}
