//! Read path: cache-aside resolution with negative caching.
//!
//! Within one resolution the sequence cache → store → cache is strict. A
//! cache failure on either side is logged and absorbed: correctness comes
//! from the record store, the cache only buys latency. A record-store
//! failure surfaces as `Unavailable` and never writes a negative entry,
//! which would otherwise mask the route until the sentinel expired.
use crate::cache::{CacheLookup, RouteCache};
use crate::error::{RoutingError, RoutingResult};
use crate::model::RouteKey;
use crate::store::RouteStore;
use std::sync::Arc;
use std::time::Instant;

pub struct Resolver {
    store: Arc<dyn RouteStore>,
    cache: Arc<dyn RouteCache>,
}

impl Resolver {
    pub fn new(store: Arc<dyn RouteStore>, cache: Arc<dyn RouteCache>) -> Self {
        Self { store, cache }
    }

    /// `resolve(tenant, service, env, version) → url | NotFound`.
    pub async fn resolve(&self, key: &RouteKey) -> RoutingResult<String> {
        key.validate().map_err(RoutingError::Validation)?;
        metrics::counter!("routeplane_resolve_requests_total").increment(1);
        let started = Instant::now();
        let result = self.resolve_inner(key).await;
        metrics::histogram!("routeplane_resolve_latency_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn resolve_inner(&self, key: &RouteKey) -> RoutingResult<String> {
        match self.cache.lookup(key).await {
            Ok(CacheLookup::Hit(url)) => {
                metrics::counter!("routeplane_cache_hit_total").increment(1);
                tracing::debug!(route = %key, "cache hit");
                return Ok(url);
            }
            Ok(CacheLookup::NegativeHit) => {
                metrics::counter!("routeplane_negative_cache_hit_total").increment(1);
                tracing::debug!(route = %key, "negative cache hit");
                return Err(RoutingError::NotFound);
            }
            Ok(CacheLookup::Miss) => {
                metrics::counter!("routeplane_cache_miss_total").increment(1);
            }
            // Unavailable cache reads degrade to a miss; no inline retry.
            Err(err) => {
                metrics::counter!("routeplane_cache_error_total").increment(1);
                tracing::warn!(route = %key, error = %err, "cache lookup failed, falling through");
            }
        }

        metrics::counter!("routeplane_db_queries_total").increment(1);
        match self.store.resolve_active_url(key).await {
            Ok(Some(url)) => {
                if let Err(err) = self.cache.store_positive(key, &url).await {
                    tracing::warn!(route = %key, error = %err, "failed to cache endpoint");
                }
                Ok(url)
            }
            Ok(None) => {
                tracing::info!(route = %key, "no active route");
                if let Err(err) = self.cache.store_negative(key).await {
                    tracing::warn!(route = %key, error = %err, "failed to cache negative result");
                }
                Err(RoutingError::NotFound)
            }
            // Never synthesize a negative entry from a store failure.
            Err(err) => Err(err.into()),
        }
    }
}
