//! Health surfaces: liveness, readiness, resilience metrics.
use crate::api::types::{LivenessResponse, ReadinessResponse};
use crate::app::AppState;
use crate::audit::AuditStore;
use crate::cache::RouteCache;
use crate::events::EventPublisher;
use crate::store::RouteStore;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::collections::BTreeMap;

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "system",
    responses((status = 200, description = "Process is alive", body = LivenessResponse))
)]
pub(crate) async fn liveness() -> Json<LivenessResponse> {
    // Liveness is independent of dependencies and of draining.
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "system",
    responses(
        (status = 200, description = "Ready to serve", body = ReadinessResponse),
        (status = 503, description = "Draining or a required dependency is down", body = ReadinessResponse)
    )
)]
pub(crate) async fn readiness(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let draining = state.kernel.drainer.is_draining();

    let (store, cache, events, audit) = tokio::join!(
        state.store.health_check(),
        state.cache.health_check(),
        state.publisher.health_check(),
        state.audit.health_check(),
    );

    let mut checks = BTreeMap::new();
    let store_ok = store.is_ok();
    checks.insert("record_store".to_string(), check_status(store.err()));
    // Cache, event log, and audit store degrade gracefully; their status is
    // reported but only the record store gates readiness.
    checks.insert("cache".to_string(), check_status(cache.err()));
    checks.insert("event_log".to_string(), check_status(events.err()));
    checks.insert("audit_store".to_string(), check_status(audit.err()));

    let ready = !draining && store_ok;
    let response = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        draining,
        checks,
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[utoipa::path(
    get,
    path = "/health/resilience",
    tag = "system",
    responses((status = 200, description = "Breaker, budget, bulkhead, and drainer metrics"))
)]
pub(crate) async fn resilience(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    Json(state.kernel.snapshot())
}

fn check_status<E: std::fmt::Display>(err: Option<E>) -> String {
    match err {
        None => "healthy".to_string(),
        Some(err) => format!("unhealthy: {err}"),
    }
}
