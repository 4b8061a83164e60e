//! Service-level error taxonomy.
//!
//! Adapter errors are classified once at the adapter boundary; everything
//! above branches only on these kinds. The HTTP layer maps them to status
//! codes in `api::error`.
use routeplane_resilience::Rejection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    /// Malformed identifier or URL. Never retried.
    #[error("validation error: {0}")]
    Validation(String),
    /// No visible active endpoint for the identifier.
    #[error("no active route found")]
    NotFound,
    /// Idempotent create with a differing URL, or a write racing an
    /// incompatible existing row.
    #[error("conflict: {0}")]
    Conflict(String),
    /// A dependency failed after the bounded retries allowed by the budget.
    #[error("dependency unavailable: {0}")]
    Unavailable(String),
    /// Load was shed by the resilience envelope (503-class, retryable).
    #[error(transparent)]
    Shed(#[from] Rejection),
    /// Programming errors and invariant violations.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
