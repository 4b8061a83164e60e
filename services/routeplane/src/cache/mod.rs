//! Cache adapter: positive and negative route entries with TTLs.
//!
//! Semantics are best effort throughout. A cache failure never fails a
//! resolution; the resolver degrades to the record store and only the hit
//! rate suffers.
use crate::model::RouteKey;
use async_trait::async_trait;
use routeplane_resilience::{FaultPolicy, Rejection};
use thiserror::Error;

pub mod memory;
pub mod redis;

/// Literal stored for negative entries ("no such route").
pub const NEGATIVE_SENTINEL: &str = "__NOT_FOUND__";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Shed(Rejection),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl FaultPolicy for CacheError {
    fn is_transient(&self) -> bool {
        matches!(self, CacheError::Unavailable(_))
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// A cached URL.
    Hit(String),
    /// The negative sentinel: the route is known not to exist.
    NegativeHit,
    Miss,
}

#[async_trait]
pub trait RouteCache: Send + Sync {
    async fn lookup(&self, key: &RouteKey) -> CacheResult<CacheLookup>;

    /// Store a URL under the positive TTL.
    async fn store_positive(&self, key: &RouteKey, url: &str) -> CacheResult<()>;

    /// Store the negative sentinel under the (shorter) negative TTL.
    async fn store_negative(&self, key: &RouteKey) -> CacheResult<()>;

    async fn invalidate(&self, key: &RouteKey) -> CacheResult<()>;

    async fn health_check(&self) -> CacheResult<()>;

    fn backend_name(&self) -> &'static str;
}
