//! In-memory TTL cache, the default backend for development and tests.
use super::{CacheLookup, CacheResult, NEGATIVE_SENTINEL, RouteCache};
use crate::model::RouteKey;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

pub struct InMemoryRouteCache {
    positive_ttl: Duration,
    negative_ttl: Duration,
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryRouteCache {
    pub fn new(positive_ttl: Duration, negative_ttl: Duration) -> Self {
        Self {
            positive_ttl,
            negative_ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn put(&self, key: &RouteKey, value: String, ttl: Duration) {
        self.entries.write().await.insert(
            key.cache_key(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

#[async_trait]
impl RouteCache for InMemoryRouteCache {
    async fn lookup(&self, key: &RouteKey) -> CacheResult<CacheLookup> {
        let cache_key = key.cache_key();
        let expired = {
            let entries = self.entries.read().await;
            match entries.get(&cache_key) {
                None => return Ok(CacheLookup::Miss),
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(if entry.value == NEGATIVE_SENTINEL {
                        CacheLookup::NegativeHit
                    } else {
                        CacheLookup::Hit(entry.value.clone())
                    });
                }
                Some(_) => true,
            }
        };
        if expired {
            self.entries.write().await.remove(&cache_key);
        }
        Ok(CacheLookup::Miss)
    }

    async fn store_positive(&self, key: &RouteKey, url: &str) -> CacheResult<()> {
        self.put(key, url.to_string(), self.positive_ttl).await;
        Ok(())
    }

    async fn store_negative(&self, key: &RouteKey) -> CacheResult<()> {
        self.put(key, NEGATIVE_SENTINEL.to_string(), self.negative_ttl)
            .await;
        Ok(())
    }

    async fn invalidate(&self, key: &RouteKey) -> CacheResult<()> {
        self.entries.write().await.remove(&key.cache_key());
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
