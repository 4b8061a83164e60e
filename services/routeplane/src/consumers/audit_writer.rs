//! Audit consumer: persist every committed mutation exactly once.
//!
//! Redelivered events collapse on the unique `event_id`, so the audit trail
//! holds one document per committed mutation no matter how many times the
//! log replays it.
use crate::audit::{AppendOutcome, AuditStore};
use crate::events::EventHandler;
use crate::model::{AuditDocument, RouteEvent};
use async_trait::async_trait;
use std::sync::Arc;

pub struct AuditWriter {
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventHandler for AuditWriter {
    fn name(&self) -> &'static str {
        "audit"
    }

    async fn handle(&self, event: &RouteEvent) -> anyhow::Result<()> {
        let document = AuditDocument::from_event(event);
        match self.store.append(document).await? {
            AppendOutcome::Recorded => {
                metrics::counter!("routeplane_audit_documents_total").increment(1);
                tracing::info!(
                    event_id = %event.event_id,
                    route = %event.route,
                    action = event.action.as_str(),
                    "audit document recorded"
                );
            }
            AppendOutcome::Duplicate => {
                tracing::debug!(event_id = %event.event_id, "duplicate delivery, already audited");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::memory::InMemoryAuditStore;
    use crate::model::{AuditQuery, RouteAction, RouteKey};

    #[tokio::test]
    async fn redelivery_yields_a_single_document() {
        let store = Arc::new(InMemoryAuditStore::new());
        let handler = AuditWriter::new(store.clone());
        let event = RouteEvent::new(
            RouteAction::Created,
            RouteKey::new("team-a", "payments", "prod", "v2"),
            "https://p/v2".into(),
            None,
            None,
            Some("alice".into()),
            Some("req-0123456789abcdef".into()),
        );

        handler.handle(&event).await.unwrap();
        handler.handle(&event).await.unwrap();
        handler.handle(&event).await.unwrap();
        assert_eq!(store.len().await, 1);

        let documents = store
            .query(&AuditQuery::for_route(&event.route))
            .await
            .unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].event_id, event.event_id.to_string());
        assert_eq!(documents[0].changed_by.as_deref(), Some("alice"));
        assert_eq!(
            documents[0].correlation_id.as_deref(),
            Some("req-0123456789abcdef")
        );
        assert!(documents[0].processed_at >= documents[0].occurred_at);
    }
}
