//! Audit store adapter: append-only documents, indexed queries.
use crate::model::{AuditDocument, AuditQuery};
use async_trait::async_trait;
use routeplane_resilience::{FaultPolicy, Rejection};
use thiserror::Error;

pub mod memory;
pub mod mongo;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Shed(Rejection),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl FaultPolicy for AuditError {
    fn is_transient(&self) -> bool {
        matches!(self, AuditError::Unavailable(_))
    }
}

pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Recorded,
    /// A document with this `event_id` already exists; redelivery collapsed.
    Duplicate,
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one document, deduplicating on `event_id`.
    async fn append(&self, document: AuditDocument) -> AuditResult<AppendOutcome>;

    /// Matching documents, newest first, bounded by the query's limit.
    async fn query(&self, query: &AuditQuery) -> AuditResult<Vec<AuditDocument>>;

    async fn health_check(&self) -> AuditResult<()>;

    fn backend_name(&self) -> &'static str;
}
