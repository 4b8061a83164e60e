//! API request/response payloads.
use crate::model::{AuditDocument, RouteKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ResolveParams {
    pub tenant: String,
    pub service: String,
    pub env: String,
    pub version: String,
}

impl ResolveParams {
    pub fn route_key(&self) -> RouteKey {
        RouteKey::new(&self.tenant, &self.service, &self.env, &self.version)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolveResponse {
    pub url: String,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRouteRequest {
    pub tenant: String,
    pub service: String,
    pub env: String,
    pub version: String,
    pub url: String,
    pub changed_by: Option<String>,
}

impl CreateRouteRequest {
    pub fn route_key(&self) -> RouteKey {
        RouteKey::new(&self.tenant, &self.service, &self.env, &self.version)
    }
}

/// Body shape shared by activate and deactivate.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RouteRefRequest {
    pub tenant: String,
    pub service: String,
    pub env: String,
    pub version: String,
    pub changed_by: Option<String>,
}

impl RouteRefRequest {
    pub fn route_key(&self) -> RouteKey {
        RouteKey::new(&self.tenant, &self.service, &self.env, &self.version)
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    pub tenant: Option<String>,
    pub service: Option<String>,
    pub env: Option<String>,
    pub version: Option<String>,
    /// One of created, activated, deactivated.
    pub action: Option<String>,
    /// RFC3339 lower bound on occurred_at.
    pub since: Option<String>,
    /// RFC3339 upper bound on occurred_at.
    pub until: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditQueryResponse {
    pub items: Vec<AuditDocument>,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LivenessResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: String,
    pub draining: bool,
    pub checks: BTreeMap<String, String>,
}
