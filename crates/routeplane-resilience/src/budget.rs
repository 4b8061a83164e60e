//! Retry budget: a sliding-window cap on retries across all callers.
//!
//! Retries amplify load on an already-struggling dependency. The budget
//! counts retry attempts against a shared per-adapter window; once spent,
//! further retries short-circuit and the guard sheds instead.
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RetryBudgetConfig {
    /// Retries permitted per window, across all callers of the adapter.
    pub max_retries: usize,
    pub window: Duration,
}

impl Default for RetryBudgetConfig {
    fn default() -> Self {
        Self {
            max_retries: 100,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryBudgetSnapshot {
    pub name: &'static str,
    pub current_retries: usize,
    pub max_retries: usize,
    pub total_retries: u64,
}

pub struct RetryBudget {
    name: &'static str,
    config: RetryBudgetConfig,
    inner: Mutex<BudgetInner>,
}

#[derive(Debug)]
struct BudgetInner {
    attempts: VecDeque<Instant>,
    total_retries: u64,
}

impl RetryBudget {
    pub fn new(name: &'static str, config: RetryBudgetConfig) -> Self {
        Self {
            name,
            config,
            inner: Mutex::new(BudgetInner {
                attempts: VecDeque::new(),
                total_retries: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stamp a retry attempt if the window has budget left. Returns `false`
    /// when the budget is spent; the caller must not retry.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        self.prune(&mut inner, now);
        if inner.attempts.len() >= self.config.max_retries {
            tracing::warn!(
                budget = self.name,
                in_window = inner.attempts.len(),
                max = self.config.max_retries,
                "retry budget exhausted"
            );
            metrics::counter!("routeplane_retry_budget_exhausted_total", "budget" => self.name)
                .increment(1);
            return false;
        }
        inner.attempts.push_back(now);
        inner.total_retries += 1;
        true
    }

    pub fn can_retry(&self) -> bool {
        let mut inner = self.inner.lock();
        self.prune(&mut inner, Instant::now());
        inner.attempts.len() < self.config.max_retries
    }

    pub fn snapshot(&self) -> RetryBudgetSnapshot {
        let mut inner = self.inner.lock();
        self.prune(&mut inner, Instant::now());
        RetryBudgetSnapshot {
            name: self.name,
            current_retries: inner.attempts.len(),
            max_retries: self.config.max_retries,
            total_retries: inner.total_retries,
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.attempts.clear();
        inner.total_retries = 0;
    }

    fn prune(&self, inner: &mut BudgetInner, now: Instant) {
        if let Some(cutoff) = now.checked_sub(self.config.window) {
            while inner.attempts.front().is_some_and(|ts| *ts < cutoff) {
                inner.attempts.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_until_exhausted() {
        let budget = RetryBudget::new(
            "db",
            RetryBudgetConfig {
                max_retries: 2,
                window: Duration::from_secs(60),
            },
        );
        assert!(budget.try_acquire());
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
        assert!(!budget.can_retry());
    }

    #[test]
    fn window_expiry_restores_budget() {
        let budget = RetryBudget::new(
            "db",
            RetryBudgetConfig {
                max_retries: 1,
                window: Duration::from_millis(30),
            },
        );
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
        std::thread::sleep(Duration::from_millis(40));
        assert!(budget.try_acquire());
    }

    #[test]
    fn snapshot_tracks_totals() {
        let budget = RetryBudget::new("redis", RetryBudgetConfig::default());
        budget.try_acquire();
        budget.try_acquire();
        let snap = budget.snapshot();
        assert_eq!(snap.current_retries, 2);
        assert_eq!(snap.total_retries, 2);
    }
}
