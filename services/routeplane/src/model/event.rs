//! Route change events: the wire payload bridging writes to side effects.
use crate::model::RouteKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteAction {
    Created,
    Activated,
    Deactivated,
}

impl RouteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteAction::Created => "created",
            RouteAction::Activated => "activated",
            RouteAction::Deactivated => "deactivated",
        }
    }
}

impl std::str::FromStr for RouteAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(RouteAction::Created),
            "activated" => Ok(RouteAction::Activated),
            "deactivated" => Ok(RouteAction::Deactivated),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EndpointState {
    Active,
    Inactive,
}

/// One route change, serialized as a single JSON message on the event log.
///
/// The route components are flattened so the wire shape matches the
/// published contract: `tenant`, `service`, `env`, `version` at top level.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RouteEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub action: RouteAction,
    #[serde(flatten)]
    pub route: RouteKey,
    pub url: String,
    pub previous_url: Option<String>,
    pub previous_state: Option<EndpointState>,
    pub changed_by: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub correlation_id: Option<String>,
}

pub const ROUTE_EVENT_TYPE: &str = "route_changed";

impl RouteEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        action: RouteAction,
        route: RouteKey,
        url: String,
        previous_url: Option<String>,
        previous_state: Option<EndpointState>,
        changed_by: Option<String>,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: ROUTE_EVENT_TYPE.to_string(),
            action,
            route,
            url,
            previous_url,
            previous_state,
            changed_by,
            occurred_at: Utc::now(),
            correlation_id,
        }
    }

    /// Partition key: the canonical route identifier. Keeps per-route order
    /// while allowing cross-route parallelism.
    pub fn partition_key(&self) -> String {
        self.route.canonical()
    }
}
