//! Consumer worker binary: runs exactly one consumer group poll loop.
//!
//! Usage: `routeplane-consumer <cache-invalidation|cache-warming|audit>`.
//! Each kind initializes only the adapters it needs and stops on
//! SIGTERM/ctrl-c.
use anyhow::{Context, Result};
use routeplane::audit::mongo::MongoAuditStore;
use routeplane::cache::redis::RedisRouteCache;
use routeplane::config::RouteplaneConfig;
use routeplane::consumers::{AuditWriter, CacheInvalidator, CacheWarmer, ConsumerKind};
use routeplane::events::kafka;
use routeplane::events::EventHandler;
use routeplane::observability;
use routeplane::resilience::ResilienceKernel;
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    let _metrics = observability::init_observability("routeplane-consumer");

    let kind: ConsumerKind = std::env::args()
        .nth(1)
        .context("usage: routeplane-consumer <cache-invalidation|cache-warming|audit>")?
        .parse()
        .map_err(anyhow::Error::msg)?;

    let config = RouteplaneConfig::from_env_or_yaml()?;
    let kafka_config = config
        .kafka
        .clone()
        .context("ROUTEPLANE_KAFKA_BROKERS must be set to run a consumer")?;
    let kernel = ResilienceKernel::new();

    let handler: Arc<dyn EventHandler> = match kind {
        ConsumerKind::CacheInvalidation | ConsumerKind::CacheWarming => {
            let redis = config
                .redis
                .as_ref()
                .context("ROUTEPLANE_REDIS_URL must be set for cache consumers")?;
            let cache = Arc::new(
                RedisRouteCache::connect(
                    &redis.url,
                    config.positive_cache_ttl,
                    config.negative_cache_ttl,
                    kernel.redis_guard(),
                )
                .await?,
            );
            if kind == ConsumerKind::CacheInvalidation {
                Arc::new(CacheInvalidator::new(cache))
            } else {
                Arc::new(CacheWarmer::new(cache))
            }
        }
        ConsumerKind::Audit => {
            let mongo = config
                .mongo
                .as_ref()
                .context("ROUTEPLANE_MONGODB_URI must be set for the audit consumer")?;
            let store = Arc::new(MongoAuditStore::connect(mongo, kernel.mongo_guard()).await?);
            Arc::new(AuditWriter::new(store))
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(_) => std::future::pending().await,
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
        tracing::info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let group_id = kind.group_id(&kafka_config.group_prefix);
    kafka::run_consumer(&kafka_config, &group_id, handler, shutdown_rx).await
}
