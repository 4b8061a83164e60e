//! Audit documents: the durable trail of committed route mutations.
use crate::model::{EndpointState, RouteAction, RouteEvent, RouteKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Hard cap on audit query page size.
pub const MAX_AUDIT_LIMIT: i64 = 1000;

/// Superset of a route event, persisted by the audit consumer.
///
/// `event_id` is the global dedup key: redelivered events must collapse into
/// a single document. Timestamps are stored as RFC3339 strings so the same
/// shape serves both the document store and the query API.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AuditDocument {
    pub event_id: String,
    pub action: RouteAction,
    pub route: RouteKey,
    pub url: String,
    pub previous_url: Option<String>,
    pub previous_state: Option<EndpointState>,
    pub changed_by: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AuditDocument {
    pub fn from_event(event: &RouteEvent) -> Self {
        Self {
            event_id: event.event_id.to_string(),
            action: event.action,
            route: event.route.clone(),
            url: event.url.clone(),
            previous_url: event.previous_url.clone(),
            previous_state: event.previous_state,
            changed_by: event.changed_by.clone(),
            occurred_at: event.occurred_at,
            processed_at: Utc::now(),
            correlation_id: event.correlation_id.clone(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Filter set for audit queries. Every field is optional; results are always
/// newest first and bounded by `limit`.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub tenant: Option<String>,
    pub service: Option<String>,
    pub env: Option<String>,
    pub version: Option<String>,
    pub action: Option<RouteAction>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: i64,
}

impl AuditQuery {
    pub fn for_route(key: &RouteKey) -> Self {
        Self {
            tenant: Some(key.tenant.clone()),
            service: Some(key.service.clone()),
            env: Some(key.env.clone()),
            version: Some(key.version.clone()),
            limit: 100,
            ..Self::default()
        }
    }

    /// Page size clamped to `[1, MAX_AUDIT_LIMIT]`.
    pub fn effective_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_AUDIT_LIMIT)
    }

    pub fn matches(&self, doc: &AuditDocument) -> bool {
        let field = |filter: &Option<String>, value: &str| {
            filter.as_deref().map_or(true, |want| want == value)
        };
        field(&self.tenant, &doc.route.tenant)
            && field(&self.service, &doc.route.service)
            && field(&self.env, &doc.route.env)
            && field(&self.version, &doc.route.version)
            && self.action.map_or(true, |action| action == doc.action)
            && self.since.map_or(true, |since| doc.occurred_at >= since)
            && self.until.map_or(true, |until| doc.occurred_at <= until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(action: RouteAction) -> AuditDocument {
        AuditDocument::from_event(&RouteEvent::new(
            action,
            RouteKey::new("team-a", "payments", "prod", "v2"),
            "https://p/v2".into(),
            None,
            None,
            None,
            None,
        ))
    }

    #[test]
    fn query_matches_on_route_and_action() {
        let document = doc(RouteAction::Created);
        let query = AuditQuery::for_route(&document.route);
        assert!(query.matches(&document));

        let mut mismatched = query.clone();
        mismatched.version = Some("v9".into());
        assert!(!mismatched.matches(&document));

        let mut by_action = AuditQuery {
            action: Some(RouteAction::Deactivated),
            ..AuditQuery::default()
        };
        assert!(!by_action.matches(&document));
        by_action.action = Some(RouteAction::Created);
        assert!(by_action.matches(&document));
    }

    #[test]
    fn limit_is_clamped() {
        let query = AuditQuery {
            limit: 50_000,
            ..AuditQuery::default()
        };
        assert_eq!(query.effective_limit(), MAX_AUDIT_LIMIT);
        let query = AuditQuery {
            limit: 0,
            ..AuditQuery::default()
        };
        assert_eq!(query.effective_limit(), 1);
    }
}
