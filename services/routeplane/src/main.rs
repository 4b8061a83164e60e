//! Routeplane server binary.
//!
//! Startup order: observability, config, resilience kernel, adapters (real
//! backends when configured, in-memory otherwise), then the HTTP listener.
//! Shutdown flips the drainer, waits for in-flight requests (bounded by the
//! drain timeout), then stops accepting connections.
use anyhow::Result;
use routeplane::app::{self, AppState};
use routeplane::audit::memory::InMemoryAuditStore;
use routeplane::audit::mongo::MongoAuditStore;
use routeplane::audit::AuditStore;
use routeplane::cache::memory::InMemoryRouteCache;
use routeplane::cache::redis::RedisRouteCache;
use routeplane::cache::RouteCache;
use routeplane::config::RouteplaneConfig;
use routeplane::events::kafka::KafkaEventPublisher;
use routeplane::events::memory::InMemoryEventLog;
use routeplane::events::EventPublisher;
use routeplane::observability;
use routeplane::resilience::ResilienceKernel;
use routeplane::service::{Mutator, Resolver};
use routeplane::store::memory::InMemoryRouteStore;
use routeplane::store::postgres::PostgresRouteStore;
use routeplane::store::RouteStore;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let metrics_handle = observability::init_observability("routeplane");
    let config = RouteplaneConfig::from_env_or_yaml()?;
    let kernel = ResilienceKernel::new();

    let store: Arc<dyn RouteStore> = match &config.postgres {
        Some(postgres) => Arc::new(
            PostgresRouteStore::connect(
                postgres,
                kernel.db_read_guard(),
                kernel.db_write_guard(),
            )
            .await?,
        ),
        None => {
            tracing::warn!("no postgres url configured, using in-memory record store");
            Arc::new(InMemoryRouteStore::new())
        }
    };

    let cache: Arc<dyn RouteCache> = match &config.redis {
        Some(redis) => Arc::new(
            RedisRouteCache::connect(
                &redis.url,
                config.positive_cache_ttl,
                config.negative_cache_ttl,
                kernel.redis_guard(),
            )
            .await?,
        ),
        None => {
            tracing::warn!("no redis url configured, using in-memory cache");
            Arc::new(InMemoryRouteCache::new(
                config.positive_cache_ttl,
                config.negative_cache_ttl,
            ))
        }
    };

    let publisher: Arc<dyn EventPublisher> = match &config.kafka {
        Some(kafka) => Arc::new(KafkaEventPublisher::new(kafka, kernel.kafka_guard())?),
        None => {
            tracing::warn!("no kafka brokers configured, using in-memory event log");
            Arc::new(InMemoryEventLog::new())
        }
    };

    let audit: Arc<dyn AuditStore> = match &config.mongo {
        Some(mongo) => Arc::new(MongoAuditStore::connect(mongo, kernel.mongo_guard()).await?),
        None => {
            tracing::warn!("no mongodb uri configured, using in-memory audit store");
            Arc::new(InMemoryAuditStore::new())
        }
    };

    tracing::info!(
        environment = %config.environment,
        record_store = store.backend_name(),
        cache = cache.backend_name(),
        event_log = publisher.backend_name(),
        audit_store = audit.backend_name(),
        "adapters ready"
    );

    let state = AppState {
        resolver: Arc::new(Resolver::new(Arc::clone(&store), Arc::clone(&cache))),
        mutator: Arc::new(Mutator::new(Arc::clone(&store), Arc::clone(&publisher))),
        store,
        cache,
        publisher,
        audit,
        kernel: Arc::clone(&kernel),
    };

    tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = app::build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, "routeplane listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(kernel, config.drain_timeout))
        .await?;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal(kernel: Arc<ResilienceKernel>, drain_timeout: Duration) {
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

    tracing::info!("shutdown signal received, draining");
    kernel.drainer.start_draining();
    if !kernel.drainer.wait_for_drain(drain_timeout).await {
        tracing::warn!(
            remaining = kernel.drainer.in_flight(),
            "drain timed out, forcing shutdown"
        );
    }
}
