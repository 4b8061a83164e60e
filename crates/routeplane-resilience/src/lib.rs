//! Resilience primitives shared by every routeplane adapter.
//!
//! # Purpose
//! Provides the four cooperating patterns the service wraps around outbound
//! calls: circuit breakers, retry budgets, bulkheads, and a graceful drainer.
//! [`AdapterGuard`] composes the first three around a single async operation;
//! the drainer gates work admission at the request boundary.
//!
//! # Notes
//! Primitives use short, bounded critical sections (`parking_lot` mutexes and
//! atomics) and never invoke an adapter while holding a lock.
pub mod breaker;
pub mod budget;
pub mod bulkhead;
pub mod drain;
pub mod guard;

pub use breaker::{BreakerConfig, BreakerSnapshot, BreakerState, CircuitBreaker};
pub use budget::{RetryBudget, RetryBudgetConfig, RetryBudgetSnapshot};
pub use bulkhead::{Bulkhead, BulkheadConfig, BulkheadPermit, BulkheadSnapshot};
pub use drain::{DrainSnapshot, Drainer, InFlightGuard};
pub use guard::{AdapterGuard, GuardError};

use thiserror::Error;

/// Load-shedding signals produced by the primitives.
///
/// These are surfaced to callers as retryable (503-class) failures rather
/// than as errors of the underlying adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("circuit breaker '{0}' is open")]
    CircuitOpen(&'static str),
    #[error("bulkhead '{0}' is full")]
    BulkheadFull(&'static str),
    #[error("retry budget '{0}' exhausted")]
    RetryBudgetExceeded(&'static str),
    #[error("draining, not accepting new work")]
    Draining,
}

/// Classifies adapter errors for the guard.
///
/// `is_transient` decides retry eligibility; `is_infrastructure` decides
/// whether the failure feeds the breaker window. Domain-level failures such
/// as constraint violations return `false` for both so they neither retry
/// nor trip the breaker.
pub trait FaultPolicy {
    fn is_transient(&self) -> bool;

    fn is_infrastructure(&self) -> bool {
        true
    }
}
