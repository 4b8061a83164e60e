//! Cache invalidation consumer: delete the entry for every route change.
use crate::cache::RouteCache;
use crate::events::EventHandler;
use crate::model::RouteEvent;
use async_trait::async_trait;
use std::sync::Arc;

pub struct CacheInvalidator {
    cache: Arc<dyn RouteCache>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<dyn RouteCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EventHandler for CacheInvalidator {
    fn name(&self) -> &'static str {
        "cache-invalidation"
    }

    async fn handle(&self, event: &RouteEvent) -> anyhow::Result<()> {
        self.cache.invalidate(&event.route).await?;
        tracing::info!(route = %event.route, action = event.action.as_str(), "cache invalidated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryRouteCache;
    use crate::cache::{CacheLookup, RouteCache};
    use crate::model::{RouteAction, RouteKey};
    use std::time::Duration;

    #[tokio::test]
    async fn deletes_the_entry_and_stays_idempotent() {
        let cache = Arc::new(InMemoryRouteCache::new(
            Duration::from_secs(60),
            Duration::from_secs(10),
        ));
        let key = RouteKey::new("team-a", "payments", "prod", "v2");
        cache.store_positive(&key, "https://p/v2").await.unwrap();

        let handler = CacheInvalidator::new(cache.clone());
        let event = RouteEvent::new(
            RouteAction::Deactivated,
            key.clone(),
            "https://p/v2".into(),
            None,
            None,
            None,
            None,
        );
        handler.handle(&event).await.unwrap();
        assert_eq!(cache.lookup(&key).await.unwrap(), CacheLookup::Miss);

        // Redelivery is a no-op.
        handler.handle(&event).await.unwrap();
        assert_eq!(cache.lookup(&key).await.unwrap(), CacheLookup::Miss);
    }
}
