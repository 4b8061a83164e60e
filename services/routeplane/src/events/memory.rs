//! In-memory event log for development and tests.
//!
//! Retains every published event in order so tests can replay them through
//! handlers and assert per-route ordering.
use super::{EventLogResult, EventPublisher};
use crate::model::RouteEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryEventLog {
    events: Arc<RwLock<Vec<RouteEvent>>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far, in publish order.
    pub async fn events(&self) -> Vec<RouteEvent> {
        self.events.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventLog {
    async fn publish(&self, event: &RouteEvent) -> EventLogResult<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn health_check(&self) -> EventLogResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RouteAction, RouteKey};

    #[tokio::test]
    async fn retains_publish_order() {
        let log = InMemoryEventLog::new();
        for action in [RouteAction::Created, RouteAction::Deactivated] {
            log.publish(&RouteEvent::new(
                action,
                RouteKey::new("t", "s", "e", "v"),
                "https://x".into(),
                None,
                None,
                None,
                None,
            ))
            .await
            .unwrap();
        }
        let events = log.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, RouteAction::Created);
        assert_eq!(events[1].action, RouteAction::Deactivated);
    }
}
