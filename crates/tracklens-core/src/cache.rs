//! Single-slot cache with get-or-fetch semantics.
//!
//! Owned by a client instance (never global). A cache without TTL keeps its
//! value for the lifetime of the owner; a cache with TTL refetches once the
//! value is older than the TTL. Concurrent misses may both fetch; the last
//! writer wins, which is fine because both fetched the same content.

use std::future::Future;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::Result;

/// Cache holding one value of `T`.
#[derive(Debug)]
pub struct TtlCache<T> {
    name: &'static str,
    ttl: Option<Duration>,
    slot: RwLock<Option<(Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    /// Cache that never expires.
    pub fn unbounded(name: &'static str) -> Self {
        Self {
            name,
            ttl: None,
            slot: RwLock::new(None),
        }
    }

    /// Cache whose value expires `ttl` after it was stored.
    pub fn with_ttl(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl: Some(ttl),
            slot: RwLock::new(None),
        }
    }

    /// Return the cached value if present and fresh.
    pub async fn get(&self) -> Option<T> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some((stored_at, value)) if self.is_fresh(*stored_at) => Some(value.clone()),
            _ => None,
        }
    }

    /// Store a value, replacing whatever was there.
    pub async fn insert(&self, value: T) {
        *self.slot.write().await = Some((Instant::now(), value));
    }

    /// Drop the cached value.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    /// Return the cached value, or run `fetch` and cache its result.
    ///
    /// Errors from `fetch` are returned as-is and nothing is cached.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get().await {
            debug!(cache = self.name, "Cache hit");
            return Ok(value);
        }

        debug!(cache = self.name, "Cache miss, fetching");
        let value = fetch().await?;
        self.insert(value.clone()).await;
        Ok(value)
    }

    fn is_fresh(&self, stored_at: Instant) -> bool {
        match self.ttl {
            Some(ttl) => stored_at.elapsed() < ttl,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_unbounded_fetches_once() {
        let cache = TtlCache::unbounded("fields");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["summary".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(value, vec!["summary".to_string()]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_refetches() {
        let cache = TtlCache::with_ttl("projects", Duration::from_secs(60));
        cache.insert(1u32).await;
        assert_eq!(cache.get().await, Some(1));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get().await, None);

        let value = cache.get_or_fetch(|| async { Ok(2u32) }).await.unwrap();
        assert_eq!(value, 2);
        assert_eq!(cache.get().await, Some(2));
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let cache: TtlCache<u32> = TtlCache::unbounded("fields");

        let result = cache
            .get_or_fetch(|| async { Err(Error::Http("down".to_string())) })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.get().await, None);

        let value = cache.get_or_fetch(|| async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = TtlCache::unbounded("fields");
        cache.insert("x".to_string()).await;
        cache.invalidate().await;
        assert!(cache.get().await.is_none());
    }
}
