//! Audit query handler: a thin surface over the audit store.
use crate::api::error::{ApiError, bad_request};
use crate::api::types::{AuditQueryParams, AuditQueryResponse, ErrorResponse};
use crate::app::AppState;
use crate::audit::AuditStore;
use crate::correlation;
use crate::error::RoutingError;
use crate::model::{AuditQuery, RouteAction};
use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};

const DEFAULT_LIMIT: i64 = 100;

#[utoipa::path(
    get,
    path = "/api/v1/audit/routes",
    tag = "audit",
    params(AuditQueryParams),
    responses(
        (status = 200, description = "Matching audit documents, newest first", body = AuditQueryResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    )
)]
pub(crate) async fn query_audit(
    Query(params): Query<AuditQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<AuditQueryResponse>, ApiError> {
    let query = build_query(&params)?;
    let items = state.audit.query(&query).await.map_err(|err| {
        ApiError::from(RoutingError::Unavailable(format!(
            "audit query failed: {err}"
        )))
    })?;
    Ok(Json(AuditQueryResponse {
        items,
        correlation_id: correlation::current(),
    }))
}

fn build_query(params: &AuditQueryParams) -> Result<AuditQuery, ApiError> {
    let action = params
        .action
        .as_deref()
        .map(|raw| raw.parse::<RouteAction>().map_err(bad_request))
        .transpose()?;
    Ok(AuditQuery {
        tenant: params.tenant.clone(),
        service: params.service.clone(),
        env: params.env.clone(),
        version: params.version.clone(),
        action,
        since: parse_timestamp(params.since.as_deref(), "since")?,
        until: parse_timestamp(params.until.as_deref(), "until")?,
        limit: params.limit.unwrap_or(DEFAULT_LIMIT),
    })
}

fn parse_timestamp(raw: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(value)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|err| bad_request(format!("{field} must be RFC3339: {err}")))
    })
    .transpose()
}
