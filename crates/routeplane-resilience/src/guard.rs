//! Composes bulkhead, breaker, and budget-gated retry around one call.
//!
//! The envelope runs bulkhead → breaker preflight → call → classify. A
//! transient failure may retry while attempts remain and the shared budget
//! grants one; non-transient failures return immediately, and only
//! infrastructure faults feed the breaker window. Wrapping stays at adapter
//! call sites, never inside business logic.
use crate::breaker::CircuitBreaker;
use crate::budget::RetryBudget;
use crate::bulkhead::Bulkhead;
use crate::{FaultPolicy, Rejection};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// Load was shed before or between attempts; the call may not have run.
    #[error(transparent)]
    Rejected(Rejection),
    /// The adapter call itself failed (after any permitted retries).
    #[error(transparent)]
    Inner(E),
}

pub struct AdapterGuard {
    name: &'static str,
    breaker: Arc<CircuitBreaker>,
    budget: Arc<RetryBudget>,
    bulkhead: Arc<Bulkhead>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl AdapterGuard {
    pub fn new(
        name: &'static str,
        breaker: Arc<CircuitBreaker>,
        budget: Arc<RetryBudget>,
        bulkhead: Arc<Bulkhead>,
    ) -> Self {
        Self {
            name,
            breaker,
            budget,
            bulkhead,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(100),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, GuardError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: FaultPolicy + Display,
    {
        // The permit spans all attempts so retries cannot exceed the class's
        // concurrency bound.
        let _permit = self
            .bulkhead
            .acquire()
            .await
            .map_err(GuardError::Rejected)?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.breaker.preflight().map_err(GuardError::Rejected)?;
            match op().await {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(err) => {
                    if err.is_infrastructure() {
                        self.breaker.record_failure();
                    }
                    if !err.is_transient() || attempt >= self.max_attempts {
                        return Err(GuardError::Inner(err));
                    }
                    if !self.budget.try_acquire() {
                        tracing::warn!(
                            guard = self.name,
                            error = %err,
                            "retry denied, budget exhausted"
                        );
                        return Err(GuardError::Rejected(Rejection::RetryBudgetExceeded(
                            self.budget.name(),
                        )));
                    }
                    tracing::debug!(guard = self.name, attempt, error = %err, "retrying");
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
            }
        }
    }
}
