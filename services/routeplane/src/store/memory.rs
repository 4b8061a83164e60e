//! In-memory implementation of the record store.
//!
//! # Purpose
//! Implements `RouteStore` with a `HashMap` behind `tokio::sync::RwLock`.
//! It exists for local development and tests (no external dependencies) and
//! is the default backend when no Postgres URL is configured.
//!
//! # Durability and consistency
//! - Not durable: all state is lost on restart.
//! - Single-process consistency: mutations take the write lock, so the
//!   unique-key invariant holds without a relational constraint.
//!
//! Parent rows have no in-memory representation; the flat endpoint map keyed
//! by the full identifier gives the same observable behavior.
use super::{CreateOutcome, RouteStore, StoreError, StoreResult, ToggleOutcome};
use crate::model::{EndpointState, RouteKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct EndpointRecord {
    url: String,
    is_active: bool,
}

#[derive(Default)]
pub struct InMemoryRouteStore {
    endpoints: Arc<RwLock<HashMap<RouteKey, EndpointRecord>>>,
}

impl InMemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouteStore for InMemoryRouteStore {
    async fn resolve_active_url(&self, key: &RouteKey) -> StoreResult<Option<String>> {
        let endpoints = self.endpoints.read().await;
        Ok(endpoints
            .get(key)
            .filter(|record| record.is_active)
            .map(|record| record.url.clone()))
    }

    async fn create_endpoint(&self, key: &RouteKey, url: &str) -> StoreResult<CreateOutcome> {
        let mut endpoints = self.endpoints.write().await;
        match endpoints.get(key) {
            None => {
                endpoints.insert(
                    key.clone(),
                    EndpointRecord {
                        url: url.to_string(),
                        is_active: true,
                    },
                );
                Ok(CreateOutcome::Created {
                    url: url.to_string(),
                })
            }
            Some(existing) if existing.url == url && existing.is_active => {
                Ok(CreateOutcome::AlreadyExists {
                    url: existing.url.clone(),
                })
            }
            Some(existing) if existing.url == url => Err(StoreError::Conflict(format!(
                "endpoint {key} exists but is inactive"
            ))),
            Some(_) => Err(StoreError::Conflict(format!(
                "endpoint {key} exists with a different url"
            ))),
        }
    }

    async fn activate_endpoint(&self, key: &RouteKey) -> StoreResult<ToggleOutcome> {
        let mut endpoints = self.endpoints.write().await;
        let record = endpoints
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.canonical()))?;
        if record.is_active {
            return Ok(ToggleOutcome::NoOp {
                url: record.url.clone(),
            });
        }
        record.is_active = true;
        Ok(ToggleOutcome::Applied {
            url: record.url.clone(),
            previous_state: EndpointState::Inactive,
        })
    }

    async fn deactivate_endpoint(&self, key: &RouteKey) -> StoreResult<ToggleOutcome> {
        let mut endpoints = self.endpoints.write().await;
        let record = endpoints
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.canonical()))?;
        if !record.is_active {
            return Ok(ToggleOutcome::NoOp {
                url: record.url.clone(),
            });
        }
        record.is_active = false;
        Ok(ToggleOutcome::Applied {
            url: record.url.clone(),
            previous_state: EndpointState::Active,
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> RouteKey {
        RouteKey::new("team-a", "payments", "prod", "v2")
    }

    #[tokio::test]
    async fn create_then_resolve() {
        let store = InMemoryRouteStore::new();
        let outcome = store.create_endpoint(&key(), "https://p/v2").await.unwrap();
        assert!(matches!(outcome, CreateOutcome::Created { .. }));
        assert_eq!(
            store.resolve_active_url(&key()).await.unwrap().as_deref(),
            Some("https://p/v2")
        );
    }

    #[tokio::test]
    async fn create_is_idempotent_on_same_url() {
        let store = InMemoryRouteStore::new();
        store.create_endpoint(&key(), "https://p/v2").await.unwrap();
        let outcome = store.create_endpoint(&key(), "https://p/v2").await.unwrap();
        assert_eq!(
            outcome,
            CreateOutcome::AlreadyExists {
                url: "https://p/v2".into()
            }
        );
    }

    #[tokio::test]
    async fn create_conflicts_on_different_url() {
        let store = InMemoryRouteStore::new();
        store.create_endpoint(&key(), "https://a").await.unwrap();
        let err = store.create_endpoint(&key(), "https://b").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        // Stored URL unchanged.
        assert_eq!(
            store.resolve_active_url(&key()).await.unwrap().as_deref(),
            Some("https://a")
        );
    }

    #[tokio::test]
    async fn create_conflicts_on_inactive_endpoint_even_with_same_url() {
        let store = InMemoryRouteStore::new();
        store.create_endpoint(&key(), "https://a").await.unwrap();
        store.deactivate_endpoint(&key()).await.unwrap();
        let err = store.create_endpoint(&key(), "https://a").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn toggle_lifecycle() {
        let store = InMemoryRouteStore::new();
        store.create_endpoint(&key(), "https://p/v2").await.unwrap();

        // Freshly created endpoints are already active.
        let outcome = store.activate_endpoint(&key()).await.unwrap();
        assert!(matches!(outcome, ToggleOutcome::NoOp { .. }));

        let outcome = store.deactivate_endpoint(&key()).await.unwrap();
        assert_eq!(
            outcome,
            ToggleOutcome::Applied {
                url: "https://p/v2".into(),
                previous_state: EndpointState::Active,
            }
        );
        assert_eq!(store.resolve_active_url(&key()).await.unwrap(), None);

        let outcome = store.activate_endpoint(&key()).await.unwrap();
        assert_eq!(
            outcome,
            ToggleOutcome::Applied {
                url: "https://p/v2".into(),
                previous_state: EndpointState::Inactive,
            }
        );
    }

    #[tokio::test]
    async fn toggling_missing_endpoint_is_not_found() {
        let store = InMemoryRouteStore::new();
        assert!(matches!(
            store.activate_endpoint(&key()).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            store.deactivate_endpoint(&key()).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }
}
