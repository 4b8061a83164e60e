//! Cache warming consumer: pre-load entries so post-change reads stay fast.
//!
//! `created` and `activated` events with a non-empty URL write the positive
//! entry; `deactivated` deletes, same as the invalidator. Racing the
//! invalidator is benign: the record store stays authoritative and the TTL
//! bounds any residual staleness.
use crate::cache::RouteCache;
use crate::events::EventHandler;
use crate::model::{RouteAction, RouteEvent};
use async_trait::async_trait;
use std::sync::Arc;

pub struct CacheWarmer {
    cache: Arc<dyn RouteCache>,
}

impl CacheWarmer {
    pub fn new(cache: Arc<dyn RouteCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EventHandler for CacheWarmer {
    fn name(&self) -> &'static str {
        "cache-warming"
    }

    async fn handle(&self, event: &RouteEvent) -> anyhow::Result<()> {
        match event.action {
            RouteAction::Created | RouteAction::Activated => {
                if event.url.trim().is_empty() {
                    tracing::warn!(route = %event.route, "skipping warm, event has no url");
                    return Ok(());
                }
                self.cache.store_positive(&event.route, &event.url).await?;
                tracing::info!(route = %event.route, "cache warmed");
            }
            RouteAction::Deactivated => {
                self.cache.invalidate(&event.route).await?;
                tracing::info!(route = %event.route, "cache entry dropped for deactivated route");
            }
        }
        Ok(())
    }
}
