//! Route resolution and mutation handlers.
use crate::api::error::ApiError;
use crate::api::types::{
    CreateRouteRequest, ErrorResponse, ResolveParams, ResolveResponse, RouteRefRequest,
};
use crate::app::AppState;
use crate::correlation;
use crate::service::{WriteDisposition, WriteReceipt};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/v1/routes/resolve",
    tag = "routes",
    params(ResolveParams),
    responses(
        (status = 200, description = "Resolved endpoint URL", body = ResolveResponse),
        (status = 404, description = "No active route", body = ErrorResponse),
        (status = 503, description = "Dependency unavailable or load shed", body = ErrorResponse)
    )
)]
pub(crate) async fn resolve_route(
    Query(params): Query<ResolveParams>,
    State(state): State<AppState>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let url = state.resolver.resolve(&params.route_key()).await?;
    Ok(Json(ResolveResponse {
        url,
        correlation_id: correlation::current(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/routes",
    tag = "routes",
    request_body = CreateRouteRequest,
    responses(
        (status = 201, description = "Route created", body = WriteReceipt),
        (status = 200, description = "Route already exists (idempotent)", body = WriteReceipt),
        (status = 400, description = "Invalid identifier or URL", body = ErrorResponse),
        (status = 409, description = "Existing route has a different URL", body = ErrorResponse)
    )
)]
pub(crate) async fn create_route(
    State(state): State<AppState>,
    Json(body): Json<CreateRouteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state
        .mutator
        .create(&body.route_key(), &body.url, body.changed_by.clone())
        .await?;
    let status = match receipt.outcome {
        WriteDisposition::Created => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(receipt)))
}

#[utoipa::path(
    post,
    path = "/api/v1/routes/activate",
    tag = "routes",
    request_body = RouteRefRequest,
    responses(
        (status = 200, description = "Route activated (or already active)", body = WriteReceipt),
        (status = 404, description = "Route not found", body = ErrorResponse)
    )
)]
pub(crate) async fn activate_route(
    State(state): State<AppState>,
    Json(body): Json<RouteRefRequest>,
) -> Result<Json<WriteReceipt>, ApiError> {
    let receipt = state
        .mutator
        .activate(&body.route_key(), body.changed_by.clone())
        .await?;
    Ok(Json(receipt))
}

#[utoipa::path(
    post,
    path = "/api/v1/routes/deactivate",
    tag = "routes",
    request_body = RouteRefRequest,
    responses(
        (status = 200, description = "Route deactivated (or already inactive)", body = WriteReceipt),
        (status = 404, description = "Route not found", body = ErrorResponse)
    )
)]
pub(crate) async fn deactivate_route(
    State(state): State<AppState>,
    Json(body): Json<RouteRefRequest>,
) -> Result<Json<WriteReceipt>, ApiError> {
    let receipt = state
        .mutator
        .deactivate(&body.route_key(), body.changed_by.clone())
        .await?;
    Ok(Json(receipt))
}
