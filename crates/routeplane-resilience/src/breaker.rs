//! Circuit breaker with a sliding failure window.
//!
//! State machine: `Closed` counts failures inside a time window and opens
//! once `failure_threshold` failures accumulate across at least `min_calls`
//! total calls. `Open` rejects every call until `timeout` elapses, then the
//! next call probes in `HalfOpen`: one success closes the circuit, one
//! failure reopens it.
use crate::Rejection;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Failures within `window` required to open the circuit.
    pub failure_threshold: usize,
    /// How long the circuit stays open before a half-open probe.
    pub timeout: Duration,
    /// Sliding window over which failures are counted.
    pub window: Duration,
    /// Minimum total calls before the circuit may open.
    pub min_calls: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            window: Duration::from_secs(60),
            min_calls: 10,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failures: VecDeque<Instant>,
    total_calls: u64,
    success_count: u64,
    opened_at: Option<Instant>,
}

/// Point-in-time view of a breaker, for the resilience health surface.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: &'static str,
    pub state: BreakerState,
    pub total_calls: u64,
    pub failure_count: usize,
    pub success_count: u64,
    pub open_for_seconds: Option<f64>,
}

pub struct CircuitBreaker {
    name: &'static str,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: BreakerConfig) -> Self {
        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failures: VecDeque::new(),
                total_calls: 0,
                success_count: 0,
                opened_at: None,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Admission check before an adapter call. Rejects in O(1) while open;
    /// transitions open → half-open once the open timeout has elapsed.
    pub fn preflight(&self) -> Result<(), Rejection> {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner, Instant::now());
        match inner.state {
            BreakerState::Open => Err(Rejection::CircuitOpen(self.name)),
            BreakerState::HalfOpen => {
                tracing::info!(breaker = self.name, "half-open probe admitted");
                Ok(())
            }
            BreakerState::Closed => Ok(()),
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.total_calls += 1;
        inner.success_count += 1;
        if inner.state == BreakerState::HalfOpen {
            tracing::info!(breaker = self.name, "half-open probe succeeded, closing");
            metrics::counter!("routeplane_breaker_transitions_total",
                "breaker" => self.name, "to" => "closed")
            .increment(1);
            inner.state = BreakerState::Closed;
            inner.failures.clear();
            inner.opened_at = None;
        }
    }

    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.total_calls += 1;
        inner.failures.push_back(now);
        match inner.state {
            BreakerState::HalfOpen => {
                tracing::warn!(breaker = self.name, "half-open probe failed, reopening");
                metrics::counter!("routeplane_breaker_transitions_total",
                    "breaker" => self.name, "to" => "open")
                .increment(1);
                inner.state = BreakerState::Open;
                inner.opened_at = Some(now);
            }
            BreakerState::Closed => {
                if let Some(cutoff) = now.checked_sub(self.config.window) {
                    while inner.failures.front().is_some_and(|ts| *ts < cutoff) {
                        inner.failures.pop_front();
                    }
                }
                if inner.total_calls >= self.config.min_calls
                    && inner.failures.len() >= self.config.failure_threshold
                {
                    tracing::warn!(
                        breaker = self.name,
                        failures = inner.failures.len(),
                        "failure threshold reached, opening"
                    );
                    metrics::counter!("routeplane_breaker_transitions_total",
                        "breaker" => self.name, "to" => "open")
                    .increment(1);
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(now);
                }
            }
            BreakerState::Open => {}
        }
    }

    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner, Instant::now());
        inner.state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        self.refresh(&mut inner, now);
        BreakerSnapshot {
            name: self.name,
            state: inner.state,
            total_calls: inner.total_calls,
            failure_count: inner.failures.len(),
            success_count: inner.success_count,
            open_for_seconds: inner
                .opened_at
                .map(|opened| now.duration_since(opened).as_secs_f64()),
        }
    }

    /// Manual reset to closed, for tests and operator intervention.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = BreakerState::Closed;
        inner.failures.clear();
        inner.success_count = 0;
        inner.opened_at = None;
    }

    fn refresh(&self, inner: &mut BreakerInner, now: Instant) {
        if let Some(cutoff) = now.checked_sub(self.config.window) {
            while inner.failures.front().is_some_and(|ts| *ts < cutoff) {
                inner.failures.pop_front();
            }
        }
        if inner.state == BreakerState::Open {
            if let Some(opened) = inner.opened_at {
                if now.duration_since(opened) >= self.config.timeout {
                    tracing::info!(breaker = self.name, "open timeout elapsed, half-open");
                    inner.state = BreakerState::HalfOpen;
                    inner.success_count = 0;
                    inner.failures.clear();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            timeout: Duration::from_millis(50),
            window: Duration::from_secs(60),
            min_calls: 3,
        }
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new("db", fast_config());
        for _ in 0..3 {
            assert!(breaker.preflight().is_ok());
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Open);
        assert_eq!(breaker.preflight(), Err(Rejection::CircuitOpen("db")));
    }

    #[test]
    fn stays_closed_below_min_calls() {
        let config = BreakerConfig {
            min_calls: 10,
            ..fast_config()
        };
        let breaker = CircuitBreaker::new("db", config);
        for _ in 0..5 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_probe_success_closes() {
        let breaker = CircuitBreaker::new("db", fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Open);

        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.preflight().is_ok());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_probe_failure_reopens() {
        let breaker = CircuitBreaker::new("db", fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.preflight().is_ok());
        breaker.record_failure();
        assert_eq!(breaker.preflight(), Err(Rejection::CircuitOpen("db")));
    }

    #[test]
    fn snapshot_reports_counts() {
        let breaker = CircuitBreaker::new("db", fast_config());
        breaker.record_success();
        breaker.record_failure();
        let snap = breaker.snapshot();
        assert_eq!(snap.total_calls, 2);
        assert_eq!(snap.failure_count, 1);
        assert_eq!(snap.success_count, 1);
        assert_eq!(snap.state, BreakerState::Closed);
    }
}
