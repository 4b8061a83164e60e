//! Composition of the resilience primitives for this service.
//!
//! One breaker and one retry budget per adapter, three bulkhead classes
//! (read, write, audit), and the process-wide drainer. Adapters receive
//! `AdapterGuard`s assembled here; the drainer gates admission at the HTTP
//! boundary. The snapshot feeds `GET /health/resilience`.
use routeplane_resilience::{
    AdapterGuard, BreakerConfig, BreakerSnapshot, Bulkhead, BulkheadConfig, BulkheadSnapshot,
    CircuitBreaker, Drainer, DrainSnapshot, RetryBudget, RetryBudgetConfig, RetryBudgetSnapshot,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub struct ResilienceKernel {
    db_breaker: Arc<CircuitBreaker>,
    redis_breaker: Arc<CircuitBreaker>,
    kafka_breaker: Arc<CircuitBreaker>,
    mongo_breaker: Arc<CircuitBreaker>,
    db_budget: Arc<RetryBudget>,
    redis_budget: Arc<RetryBudget>,
    kafka_budget: Arc<RetryBudget>,
    mongo_budget: Arc<RetryBudget>,
    read_bulkhead: Arc<Bulkhead>,
    write_bulkhead: Arc<Bulkhead>,
    audit_bulkhead: Arc<Bulkhead>,
    pub drainer: Arc<Drainer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResilienceSnapshot {
    pub circuit_breakers: Vec<BreakerSnapshot>,
    pub retry_budgets: Vec<RetryBudgetSnapshot>,
    pub bulkheads: Vec<BulkheadSnapshot>,
    pub graceful_draining: DrainSnapshot,
}

impl ResilienceKernel {
    pub fn new() -> Arc<Self> {
        let database_breaker = BreakerConfig::default();
        // The cache is less critical than the record store: tolerate more
        // failures and probe recovery sooner.
        let redis_breaker = BreakerConfig {
            failure_threshold: 10,
            timeout: Duration::from_secs(30),
            min_calls: 20,
            ..BreakerConfig::default()
        };
        Arc::new(Self {
            db_breaker: Arc::new(CircuitBreaker::new("database", database_breaker.clone())),
            redis_breaker: Arc::new(CircuitBreaker::new("redis", redis_breaker)),
            kafka_breaker: Arc::new(CircuitBreaker::new("kafka", database_breaker.clone())),
            mongo_breaker: Arc::new(CircuitBreaker::new("mongodb", database_breaker)),
            db_budget: Arc::new(RetryBudget::new(
                "database",
                RetryBudgetConfig {
                    max_retries: 100,
                    window: Duration::from_secs(60),
                },
            )),
            redis_budget: Arc::new(RetryBudget::new(
                "redis",
                RetryBudgetConfig {
                    max_retries: 200,
                    window: Duration::from_secs(60),
                },
            )),
            kafka_budget: Arc::new(RetryBudget::new("kafka", RetryBudgetConfig::default())),
            mongo_budget: Arc::new(RetryBudget::new("mongodb", RetryBudgetConfig::default())),
            read_bulkhead: Arc::new(Bulkhead::new(
                "read_operations",
                BulkheadConfig {
                    max_concurrent: 20,
                    acquire_timeout: Duration::from_secs(5),
                },
            )),
            write_bulkhead: Arc::new(Bulkhead::new(
                "write_operations",
                BulkheadConfig {
                    max_concurrent: 5,
                    acquire_timeout: Duration::from_secs(10),
                },
            )),
            audit_bulkhead: Arc::new(Bulkhead::new(
                "audit_operations",
                BulkheadConfig {
                    max_concurrent: 10,
                    acquire_timeout: Duration::from_secs(5),
                },
            )),
            drainer: Drainer::new("api_server"),
        })
    }

    pub fn db_read_guard(&self) -> AdapterGuard {
        AdapterGuard::new(
            "database",
            Arc::clone(&self.db_breaker),
            Arc::clone(&self.db_budget),
            Arc::clone(&self.read_bulkhead),
        )
    }

    pub fn db_write_guard(&self) -> AdapterGuard {
        AdapterGuard::new(
            "database",
            Arc::clone(&self.db_breaker),
            Arc::clone(&self.db_budget),
            Arc::clone(&self.write_bulkhead),
        )
    }

    pub fn redis_guard(&self) -> AdapterGuard {
        AdapterGuard::new(
            "redis",
            Arc::clone(&self.redis_breaker),
            Arc::clone(&self.redis_budget),
            Arc::clone(&self.read_bulkhead),
        )
    }

    pub fn kafka_guard(&self) -> AdapterGuard {
        AdapterGuard::new(
            "kafka",
            Arc::clone(&self.kafka_breaker),
            Arc::clone(&self.kafka_budget),
            Arc::clone(&self.write_bulkhead),
        )
    }

    pub fn mongo_guard(&self) -> AdapterGuard {
        AdapterGuard::new(
            "mongodb",
            Arc::clone(&self.mongo_breaker),
            Arc::clone(&self.mongo_budget),
            Arc::clone(&self.audit_bulkhead),
        )
    }

    pub fn snapshot(&self) -> ResilienceSnapshot {
        ResilienceSnapshot {
            circuit_breakers: vec![
                self.db_breaker.snapshot(),
                self.redis_breaker.snapshot(),
                self.kafka_breaker.snapshot(),
                self.mongo_breaker.snapshot(),
            ],
            retry_budgets: vec![
                self.db_budget.snapshot(),
                self.redis_budget.snapshot(),
                self.kafka_budget.snapshot(),
                self.mongo_budget.snapshot(),
            ],
            bulkheads: vec![
                self.read_bulkhead.snapshot(),
                self.write_bulkhead.snapshot(),
                self.audit_bulkhead.snapshot(),
            ],
            graceful_draining: self.drainer.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_covers_all_primitives() {
        let kernel = ResilienceKernel::new();
        let snapshot = kernel.snapshot();
        assert_eq!(snapshot.circuit_breakers.len(), 4);
        assert_eq!(snapshot.retry_budgets.len(), 4);
        assert_eq!(snapshot.bulkheads.len(), 3);
        assert!(!snapshot.graceful_draining.draining);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["circuit_breakers"][0]["state"], "closed");
        assert_eq!(json["bulkheads"][1]["name"], "write_operations");
    }
}
