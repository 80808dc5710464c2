//! AI response cache, keyed by job-specification content hash.
//!
//! The cache exists to bound AI spend: the same job description analyzed
//! twice must not pay for two AI calls. Both backends treat every failure
//! as a miss — a broken cache degrades cost, never correctness.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::warn;

use crate::ai_client::AiAnalysis;

#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<AiAnalysis>;
    async fn put(&self, key: &str, value: &AiAnalysis, ttl: Duration);
}

/// Process-local fallback used when no Redis URL is configured.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (Instant, AiAnalysis)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<AiAnalysis> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((deadline, value)) if *deadline > now => return Some(value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: drop it so the map cannot grow unbounded on repeats.
        self.entries.write().await.remove(key);
        None
    }

    async fn put(&self, key: &str, value: &AiAnalysis, ttl: Duration) {
        let deadline = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (deadline, value.clone()));
    }
}

/// Shared cache for multi-instance deployments. Values are stored as JSON
/// with Redis-side expiry.
pub struct RedisCache {
    client: redis::Client,
    prefix: &'static str,
}

impl RedisCache {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            prefix: "rescore:ai:",
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &str) -> Option<AiAnalysis> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!("redis connection failed, treating as cache miss: {e}");
                return None;
            }
        };
        let raw: Option<String> = match conn.get(self.full_key(key)).await {
            Ok(v) => v,
            Err(e) => {
                warn!("redis GET failed, treating as cache miss: {e}");
                return None;
            }
        };
        raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("discarding unreadable cached AI analysis: {e}");
                None
            }
        })
    }

    async fn put(&self, key: &str, value: &AiAnalysis, ttl: Duration) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                warn!("failed to serialize AI analysis for cache: {e}");
                return;
            }
        };
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!("redis connection failed, skipping cache write: {e}");
                return;
            }
        };
        let result: redis::RedisResult<()> = conn
            .set_ex(self.full_key(key), json, ttl.as_secs())
            .await;
        if let Err(e) = result {
            warn!("redis SETEX failed, skipping cache write: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn analysis(score: u8) -> AiAnalysis {
        AiAnalysis {
            score,
            breakdown: BTreeMap::new(),
            suggestions: vec!["Add metrics to bullets".to_string()],
        }
    }

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let cache = InMemoryCache::new();
        cache
            .put("abc", &analysis(70), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("abc").await, Some(analysis(70)));
        assert_eq!(cache.get("other").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_memory_entries_expire() {
        let cache = InMemoryCache::new();
        cache
            .put("abc", &analysis(70), Duration::from_secs(60))
            .await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("abc").await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("abc").await, None);
    }

    #[tokio::test]
    async fn test_in_memory_overwrite_refreshes_value() {
        let cache = InMemoryCache::new();
        cache
            .put("abc", &analysis(50), Duration::from_secs(60))
            .await;
        cache
            .put("abc", &analysis(90), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("abc").await.unwrap().score, 90);
    }
}
