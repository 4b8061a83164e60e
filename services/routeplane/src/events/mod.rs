//! Event log adapter: ordered, keyed route-event publish and consumption.
//!
//! Publication is best effort from the write path's point of view: the
//! mutator logs and counts a terminal publish failure but never fails the
//! user-visible write. Consumers are at-least-once and must be idempotent.
use crate::model::RouteEvent;
use async_trait::async_trait;
use routeplane_resilience::{FaultPolicy, Rejection};
use thiserror::Error;

pub mod kafka;
pub mod memory;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event log unavailable: {0}")]
    Unavailable(String),
    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Shed(Rejection),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl FaultPolicy for EventLogError {
    fn is_transient(&self) -> bool {
        matches!(self, EventLogError::Unavailable(_))
    }

    fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            EventLogError::Unavailable(_) | EventLogError::Unexpected(_)
        )
    }
}

pub type EventLogResult<T> = Result<T, EventLogError>;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one event keyed by the canonical route identifier, waiting
    /// for full replication acknowledgment, within a bounded deadline.
    async fn publish(&self, event: &RouteEvent) -> EventLogResult<()>;

    async fn health_check(&self) -> EventLogResult<()>;

    fn backend_name(&self) -> &'static str;
}

/// One logical consumer's side effect. Handlers must be idempotent: the
/// poll loop commits the offset only after `handle` returns `Ok`, so any
/// failure leads to redelivery.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &RouteEvent) -> anyhow::Result<()>;
}
