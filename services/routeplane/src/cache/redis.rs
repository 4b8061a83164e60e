//! Redis-backed cache.
//!
//! Uses a multiplexed `ConnectionManager` that reconnects internally; each
//! call clones the handle, so no lock is held across suspension points.
//! Calls are wrapped in the redis `AdapterGuard` (breaker has a higher
//! threshold than the database: the cache is load-bearing but not
//! correctness-bearing).
use super::{CacheError, CacheLookup, CacheResult, NEGATIVE_SENTINEL, RouteCache};
use crate::model::RouteKey;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use routeplane_resilience::{AdapterGuard, GuardError};
use std::time::Duration;

pub struct RedisRouteCache {
    manager: ConnectionManager,
    positive_ttl: Duration,
    negative_ttl: Duration,
    guard: AdapterGuard,
}

impl RedisRouteCache {
    pub async fn connect(
        url: &str,
        positive_ttl: Duration,
        negative_ttl: Duration,
        guard: AdapterGuard,
    ) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager,
            positive_ttl,
            negative_ttl,
            guard,
        })
    }

    async fn set_with_ttl(&self, cache_key: String, value: &str, ttl: Duration) -> CacheResult<()> {
        let result = self
            .guard
            .execute(|| {
                let mut conn = self.manager.clone();
                let cache_key = cache_key.clone();
                async move {
                    conn.set_ex::<_, _, ()>(cache_key, value, ttl.as_secs())
                        .await
                        .map_err(map_redis)
                }
            })
            .await;
        flatten_guard(result)
    }
}

#[async_trait]
impl RouteCache for RedisRouteCache {
    async fn lookup(&self, key: &RouteKey) -> CacheResult<CacheLookup> {
        let cache_key = key.cache_key();
        let result = self
            .guard
            .execute(|| {
                let mut conn = self.manager.clone();
                let cache_key = cache_key.clone();
                async move {
                    conn.get::<_, Option<String>>(cache_key)
                        .await
                        .map_err(map_redis)
                }
            })
            .await;
        let value = flatten_guard(result)?;
        Ok(match value {
            None => CacheLookup::Miss,
            Some(v) if v == NEGATIVE_SENTINEL => CacheLookup::NegativeHit,
            Some(v) => CacheLookup::Hit(v),
        })
    }

    async fn store_positive(&self, key: &RouteKey, url: &str) -> CacheResult<()> {
        self.set_with_ttl(key.cache_key(), url, self.positive_ttl)
            .await
    }

    async fn store_negative(&self, key: &RouteKey) -> CacheResult<()> {
        self.set_with_ttl(key.cache_key(), NEGATIVE_SENTINEL, self.negative_ttl)
            .await
    }

    async fn invalidate(&self, key: &RouteKey) -> CacheResult<()> {
        let cache_key = key.cache_key();
        let result = self
            .guard
            .execute(|| {
                let mut conn = self.manager.clone();
                let cache_key = cache_key.clone();
                async move { conn.del::<_, ()>(cache_key).await.map_err(map_redis) }
            })
            .await;
        flatten_guard(result)
    }

    async fn health_check(&self) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

fn flatten_guard<T>(result: Result<T, GuardError<CacheError>>) -> CacheResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(GuardError::Rejected(rejection)) => Err(CacheError::Shed(rejection)),
        Err(GuardError::Inner(err)) => Err(err),
    }
}

fn map_redis(err: redis::RedisError) -> CacheError {
    // Protocol-level surprises and connection loss look the same to the
    // resolver: the cache is unavailable and the record store decides.
    CacheError::Unavailable(err.to_string())
}
