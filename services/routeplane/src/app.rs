//! HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! The drain gate wraps only the `/api` routes: health endpoints must keep
//! answering during a drain so the load balancer can observe the flip to
//! not-ready, and in-flight work is counted per request rather than per
//! adapter call so a drain lets admitted requests finish.
use crate::api;
use crate::api::error::ApiError;
use crate::api::openapi::ApiDoc;
use crate::audit::AuditStore;
use crate::cache::RouteCache;
use crate::correlation;
use crate::error::RoutingError;
use crate::events::EventPublisher;
use crate::observability;
use crate::resilience::ResilienceKernel;
use crate::service::{Mutator, Resolver};
use crate::store::RouteStore;
use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub mutator: Arc<Mutator>,
    pub store: Arc<dyn RouteStore>,
    pub cache: Arc<dyn RouteCache>,
    pub publisher: Arc<dyn EventPublisher>,
    pub audit: Arc<dyn AuditStore>,
    pub kernel: Arc<ResilienceKernel>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    let api_routes = Router::new()
        .route(
            "/api/v1/routes/resolve",
            axum::routing::get(api::routes::resolve_route),
        )
        .route(
            "/api/v1/routes",
            axum::routing::post(api::routes::create_route),
        )
        .route(
            "/api/v1/routes/activate",
            axum::routing::post(api::routes::activate_route),
        )
        .route(
            "/api/v1/routes/deactivate",
            axum::routing::post(api::routes::deactivate_route),
        )
        .route(
            "/api/v1/audit/routes",
            axum::routing::get(api::audit::query_audit),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            drain_gate,
        ));

    Router::new()
        .route("/health/live", axum::routing::get(api::system::liveness))
        .route("/health/ready", axum::routing::get(api::system::readiness))
        .route(
            "/health/resilience",
            axum::routing::get(api::system::resilience),
        )
        .merge(api_routes)
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs")
                .url("/api/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(axum::middleware::from_fn(correlation::middleware))
        .layer(trace_layer)
        .with_state(state)
}

/// Admission gate: reject new API work while draining, count it in flight
/// otherwise. The guard is held for the whole request.
async fn drain_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match state.kernel.drainer.enter() {
        Ok(_in_flight) => {
            metrics::gauge!("routeplane_in_flight_requests")
                .set(state.kernel.drainer.in_flight() as f64);
            next.run(request).await
        }
        Err(rejection) => ApiError::from(RoutingError::Shed(rejection)).into_response(),
    }
}
