//! Token validation seam.

use async_trait::async_trait;

/// Decides whether a bearer token is currently accepted by the identity
/// provider.
///
/// Implementations must collapse every failure (network error, non-success
/// status, malformed response) into `false`. There is no caching: each call
/// is a fresh round trip.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> bool;
}
