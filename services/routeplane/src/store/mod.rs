//! Record store adapter: transactional CRUD over the normalized route schema.
//!
//! The record store is the system of record. Two backends implement the
//! trait: a durable Postgres store and an in-memory store for development
//! and tests.
use crate::model::{EndpointState, RouteKey};
use async_trait::async_trait;
use routeplane_resilience::{FaultPolicy, Rejection};
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// Connection/timeout class failures. Retry-eligible.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    /// Load shed by the resilience envelope before or between attempts.
    #[error(transparent)]
    Shed(Rejection),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl FaultPolicy for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    fn is_infrastructure(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Unexpected(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for crate::error::RoutingError {
    fn from(err: StoreError) -> Self {
        use crate::error::RoutingError;
        match err {
            StoreError::NotFound(_) => RoutingError::NotFound,
            StoreError::Conflict(message) => RoutingError::Conflict(message),
            StoreError::Unavailable(message) => RoutingError::Unavailable(message),
            StoreError::Shed(rejection) => RoutingError::Shed(rejection),
            StoreError::Unexpected(err) => RoutingError::Internal(err),
        }
    }
}

/// Result of an idempotent create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created { url: String },
    /// Identical URL on an active endpoint: idempotent replay, no state
    /// change, no event.
    AlreadyExists { url: String },
}

/// Result of an activate/deactivate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Applied {
        url: String,
        previous_state: EndpointState,
    },
    /// Endpoint already in the target state.
    NoOp { url: String },
}

#[async_trait]
pub trait RouteStore: Send + Sync {
    /// The single active endpoint URL for the identifier, if any.
    async fn resolve_active_url(&self, key: &RouteKey) -> StoreResult<Option<String>>;

    /// Insert the endpoint (creating parent rows on demand). Conflicts with
    /// a differing URL, or with a matching URL on an inactive endpoint,
    /// surface as `StoreError::Conflict`.
    async fn create_endpoint(&self, key: &RouteKey, url: &str) -> StoreResult<CreateOutcome>;

    async fn activate_endpoint(&self, key: &RouteKey) -> StoreResult<ToggleOutcome>;

    async fn deactivate_endpoint(&self, key: &RouteKey) -> StoreResult<ToggleOutcome>;

    async fn health_check(&self) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}
