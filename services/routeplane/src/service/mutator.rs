//! Write path: validated, transactional mutation with post-commit events.
//!
//! The identifier itself is the idempotency key: get-or-insert parents plus
//! the endpoint unique constraint make replay safe without a separate
//! token. An event is emitted if and only if a transaction committed a
//! state change; no-op replays return the effective outcome without a
//! duplicate event. Publication is awaited before returning so per-route
//! publish order matches commit order, and a terminal publish failure is
//! logged and counted, never surfaced to the caller.
use crate::correlation;
use crate::error::{RoutingError, RoutingResult};
use crate::events::EventPublisher;
use crate::model::{RouteAction, RouteEvent, RouteKey};
use crate::store::{CreateOutcome, RouteStore, ToggleOutcome};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

/// The effective outcome of a write, reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WriteDisposition {
    Created,
    AlreadyExists,
    Activated,
    AlreadyActive,
    Deactivated,
    AlreadyInactive,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WriteReceipt {
    #[serde(flatten)]
    pub route: RouteKey,
    pub url: String,
    pub is_active: bool,
    pub outcome: WriteDisposition,
}

pub struct Mutator {
    store: Arc<dyn RouteStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl Mutator {
    pub fn new(store: Arc<dyn RouteStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    pub async fn create(
        &self,
        key: &RouteKey,
        url: &str,
        changed_by: Option<String>,
    ) -> RoutingResult<WriteReceipt> {
        key.validate().map_err(RoutingError::Validation)?;
        if url.trim().is_empty() {
            return Err(RoutingError::Validation("url must not be empty".into()));
        }
        self.timed("create", || async {
            match self.store.create_endpoint(key, url).await? {
                CreateOutcome::Created { url } => {
                    tracing::info!(route = %key, %url, "route created");
                    self.publish_after_commit(RouteEvent::new(
                        RouteAction::Created,
                        key.clone(),
                        url.clone(),
                        None,
                        None,
                        changed_by,
                        correlation::current(),
                    ))
                    .await;
                    Ok(WriteReceipt {
                        route: key.clone(),
                        url,
                        is_active: true,
                        outcome: WriteDisposition::Created,
                    })
                }
                CreateOutcome::AlreadyExists { url } => {
                    tracing::info!(route = %key, "route already exists, idempotent create");
                    Ok(WriteReceipt {
                        route: key.clone(),
                        url,
                        is_active: true,
                        outcome: WriteDisposition::AlreadyExists,
                    })
                }
            }
        })
        .await
    }

    pub async fn activate(
        &self,
        key: &RouteKey,
        changed_by: Option<String>,
    ) -> RoutingResult<WriteReceipt> {
        key.validate().map_err(RoutingError::Validation)?;
        self.timed("activate", || async {
            match self.store.activate_endpoint(key).await? {
                ToggleOutcome::Applied {
                    url,
                    previous_state,
                } => {
                    tracing::info!(route = %key, "route activated");
                    self.publish_after_commit(RouteEvent::new(
                        RouteAction::Activated,
                        key.clone(),
                        url.clone(),
                        Some(url.clone()),
                        Some(previous_state),
                        changed_by,
                        correlation::current(),
                    ))
                    .await;
                    Ok(WriteReceipt {
                        route: key.clone(),
                        url,
                        is_active: true,
                        outcome: WriteDisposition::Activated,
                    })
                }
                ToggleOutcome::NoOp { url } => Ok(WriteReceipt {
                    route: key.clone(),
                    url,
                    is_active: true,
                    outcome: WriteDisposition::AlreadyActive,
                }),
            }
        })
        .await
    }

    pub async fn deactivate(
        &self,
        key: &RouteKey,
        changed_by: Option<String>,
    ) -> RoutingResult<WriteReceipt> {
        key.validate().map_err(RoutingError::Validation)?;
        self.timed("deactivate", || async {
            match self.store.deactivate_endpoint(key).await? {
                ToggleOutcome::Applied {
                    url,
                    previous_state,
                } => {
                    tracing::info!(route = %key, "route deactivated");
                    self.publish_after_commit(RouteEvent::new(
                        RouteAction::Deactivated,
                        key.clone(),
                        url.clone(),
                        Some(url.clone()),
                        Some(previous_state),
                        changed_by,
                        correlation::current(),
                    ))
                    .await;
                    Ok(WriteReceipt {
                        route: key.clone(),
                        url,
                        is_active: false,
                        outcome: WriteDisposition::Deactivated,
                    })
                }
                ToggleOutcome::NoOp { url } => Ok(WriteReceipt {
                    route: key.clone(),
                    url,
                    is_active: false,
                    outcome: WriteDisposition::AlreadyInactive,
                }),
            }
        })
        .await
    }

    async fn timed<F, Fut>(&self, operation: &'static str, f: F) -> RoutingResult<WriteReceipt>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = RoutingResult<WriteReceipt>>,
    {
        metrics::counter!("routeplane_write_requests_total", "operation" => operation)
            .increment(1);
        let started = Instant::now();
        let result = f().await;
        metrics::histogram!("routeplane_write_latency_seconds", "operation" => operation)
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(_) => {
                metrics::counter!("routeplane_write_success_total", "operation" => operation)
                    .increment(1)
            }
            Err(_) => {
                metrics::counter!("routeplane_write_failure_total", "operation" => operation)
                    .increment(1)
            }
        }
        result
    }

    /// Best effort, after commit only. The committed state stands whether or
    /// not the event lands; TTLs and reconciliation bound the staleness.
    async fn publish_after_commit(&self, event: RouteEvent) {
        let action = event.action.as_str();
        match self.publisher.publish(&event).await {
            Ok(()) => {
                metrics::counter!("routeplane_events_published_total", "action" => action)
                    .increment(1);
                tracing::debug!(event_id = %event.event_id, action, "route event published");
            }
            Err(err) => {
                metrics::counter!("routeplane_events_failed_total", "action" => action)
                    .increment(1);
                tracing::warn!(
                    event_id = %event.event_id,
                    action,
                    error = %err,
                    "route event publish failed (write already committed)"
                );
            }
        }
    }
}
