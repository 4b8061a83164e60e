//! Event consumers: cache invalidation, cache warming, audit persistence.
//!
//! Each consumer runs in its own consumer group so every side effect sees
//! every event independently. All handlers are idempotent; redelivery is
//! expected and harmless.
mod audit_writer;
mod invalidator;
mod warmer;

pub use audit_writer::AuditWriter;
pub use invalidator::CacheInvalidator;
pub use warmer::CacheWarmer;

use std::str::FromStr;

/// The logical consumers sharing the route-events log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerKind {
    CacheInvalidation,
    CacheWarming,
    Audit,
}

impl ConsumerKind {
    pub const ALL: [ConsumerKind; 3] = [
        ConsumerKind::CacheInvalidation,
        ConsumerKind::CacheWarming,
        ConsumerKind::Audit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumerKind::CacheInvalidation => "cache-invalidation",
            ConsumerKind::CacheWarming => "cache-warming",
            ConsumerKind::Audit => "audit",
        }
    }

    /// Consumer group id under the shared prefix, one group per consumer.
    pub fn group_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.as_str())
    }
}

impl FromStr for ConsumerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache-invalidation" => Ok(ConsumerKind::CacheInvalidation),
            "cache-warming" => Ok(ConsumerKind::CacheWarming),
            "audit" => Ok(ConsumerKind::Audit),
            other => Err(format!(
                "unknown consumer kind '{other}' (expected cache-invalidation, cache-warming, or audit)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_ids_are_distinct_per_consumer() {
        let ids: Vec<String> = ConsumerKind::ALL
            .iter()
            .map(|kind| kind.group_id("routeplane"))
            .collect();
        assert_eq!(ids[0], "routeplane-cache-invalidation");
        assert_eq!(ids.len(), 3);
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn parses_kind_names() {
        assert_eq!(
            "cache-warming".parse::<ConsumerKind>().unwrap(),
            ConsumerKind::CacheWarming
        );
        assert!("nope".parse::<ConsumerKind>().is_err());
    }
}
