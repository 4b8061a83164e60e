//! In-memory audit store for development and tests.
use super::{AppendOutcome, AuditResult, AuditStore};
use crate::model::{AuditDocument, AuditQuery};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryAuditStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    documents: Vec<AuditDocument>,
    seen_event_ids: HashSet<String>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.documents.is_empty()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, document: AuditDocument) -> AuditResult<AppendOutcome> {
        let mut inner = self.inner.write().await;
        if !inner.seen_event_ids.insert(document.event_id.clone()) {
            return Ok(AppendOutcome::Duplicate);
        }
        inner.documents.push(document);
        Ok(AppendOutcome::Recorded)
    }

    async fn query(&self, query: &AuditQuery) -> AuditResult<Vec<AuditDocument>> {
        let inner = self.inner.read().await;
        let mut matched: Vec<AuditDocument> = inner
            .documents
            .iter()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        matched.truncate(query.effective_limit() as usize);
        Ok(matched)
    }

    async fn health_check(&self) -> AuditResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RouteAction, RouteEvent, RouteKey};

    fn document() -> AuditDocument {
        AuditDocument::from_event(&RouteEvent::new(
            RouteAction::Created,
            RouteKey::new("team-a", "payments", "prod", "v2"),
            "https://p/v2".into(),
            None,
            None,
            Some("alice".into()),
            Some("req-0123456789abcdef".into()),
        ))
    }

    #[tokio::test]
    async fn appends_and_deduplicates() {
        let store = InMemoryAuditStore::new();
        let doc = document();
        assert_eq!(
            store.append(doc.clone()).await.unwrap(),
            AppendOutcome::Recorded
        );
        assert_eq!(store.append(doc).await.unwrap(), AppendOutcome::Duplicate);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn queries_newest_first_with_limit() {
        let store = InMemoryAuditStore::new();
        for _ in 0..3 {
            store.append(document()).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let query = AuditQuery {
            tenant: Some("team-a".into()),
            limit: 2,
            ..AuditQuery::default()
        };
        let results = store.query(&query).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].occurred_at >= results[1].occurred_at);
    }
}
