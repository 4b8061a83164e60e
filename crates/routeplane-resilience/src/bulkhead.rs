//! Bulkhead: a bounded concurrency class per operation type.
//!
//! Separate read, write, and audit classes keep slow admin or audit work
//! from starving the hot read path. Acquisition waits up to a timeout and
//! then sheds with `BulkheadFull`.
use crate::Rejection;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct BulkheadConfig {
    pub max_concurrent: usize,
    /// How long a caller may wait for a slot before shedding.
    pub acquire_timeout: Duration,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkheadSnapshot {
    pub name: &'static str,
    pub in_use: usize,
    pub max_concurrent: usize,
    pub total_operations: u64,
    pub rejected_operations: u64,
}

pub struct Bulkhead {
    name: &'static str,
    config: BulkheadConfig,
    semaphore: Arc<Semaphore>,
    total: AtomicU64,
    rejected: AtomicU64,
}

/// Slot held for the duration of one guarded operation. Dropping it frees
/// the slot even if the operation panicked or was cancelled.
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
}

impl Bulkhead {
    pub fn new(name: &'static str, config: BulkheadConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        Self {
            name,
            config,
            semaphore,
            total: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn acquire(&self) -> Result<BulkheadPermit, Rejection> {
        let acquired = tokio::time::timeout(
            self.config.acquire_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await;
        match acquired {
            Ok(Ok(permit)) => {
                self.total.fetch_add(1, Ordering::Relaxed);
                Ok(BulkheadPermit { _permit: permit })
            }
            // The semaphore is never closed; timeout is the only miss path.
            _ => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    bulkhead = self.name,
                    max_concurrent = self.config.max_concurrent,
                    "no slot within acquire timeout"
                );
                metrics::counter!("routeplane_bulkhead_rejected_total", "bulkhead" => self.name)
                    .increment(1);
                Err(Rejection::BulkheadFull(self.name))
            }
        }
    }

    pub fn in_use(&self) -> usize {
        self.config.max_concurrent - self.semaphore.available_permits()
    }

    pub fn snapshot(&self) -> BulkheadSnapshot {
        BulkheadSnapshot {
            name: self.name,
            in_use: self.in_use(),
            max_concurrent: self.config.max_concurrent,
            total_operations: self.total.load(Ordering::Relaxed),
            rejected_operations: self.rejected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limits_concurrency() {
        let bulkhead = Bulkhead::new(
            "read",
            BulkheadConfig {
                max_concurrent: 2,
                acquire_timeout: Duration::from_millis(20),
            },
        );
        let a = bulkhead.acquire().await.unwrap();
        let _b = bulkhead.acquire().await.unwrap();
        assert_eq!(bulkhead.in_use(), 2);

        let rejected = bulkhead.acquire().await;
        assert_eq!(rejected.err(), Some(Rejection::BulkheadFull("read")));

        drop(a);
        assert!(bulkhead.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn waits_for_freed_slot() {
        let bulkhead = Arc::new(Bulkhead::new(
            "write",
            BulkheadConfig {
                max_concurrent: 1,
                acquire_timeout: Duration::from_millis(200),
            },
        ));
        let held = bulkhead.acquire().await.unwrap();
        let contender = {
            let bulkhead = Arc::clone(&bulkhead);
            tokio::spawn(async move { bulkhead.acquire().await.is_ok() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        assert!(contender.await.unwrap());
    }

    #[tokio::test]
    async fn snapshot_counts_rejections() {
        let bulkhead = Bulkhead::new(
            "audit",
            BulkheadConfig {
                max_concurrent: 1,
                acquire_timeout: Duration::from_millis(10),
            },
        );
        let _held = bulkhead.acquire().await.unwrap();
        let _ = bulkhead.acquire().await;
        let snap = bulkhead.snapshot();
        assert_eq!(snap.total_operations, 1);
        assert_eq!(snap.rejected_operations, 1);
        assert_eq!(snap.in_use, 1);
    }
}
