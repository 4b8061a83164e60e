//! OpenAPI document for the routeplane API.
use crate::api;
use crate::api::types::{
    AuditQueryResponse, CreateRouteRequest, ErrorResponse, LivenessResponse, ReadinessResponse,
    ResolveResponse, RouteRefRequest,
};
use crate::model::{AuditDocument, EndpointState, RouteAction, RouteKey};
use crate::service::{WriteDisposition, WriteReceipt};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "routeplane",
        version = "v1",
        description = "Multi-tenant routing control plane HTTP API"
    ),
    paths(
        api::routes::resolve_route,
        api::routes::create_route,
        api::routes::activate_route,
        api::routes::deactivate_route,
        api::audit::query_audit,
        api::system::liveness,
        api::system::readiness,
        api::system::resilience,
    ),
    components(schemas(
        ResolveResponse,
        CreateRouteRequest,
        RouteRefRequest,
        WriteReceipt,
        WriteDisposition,
        RouteKey,
        RouteAction,
        EndpointState,
        AuditDocument,
        AuditQueryResponse,
        ErrorResponse,
        LivenessResponse,
        ReadinessResponse,
    )),
    tags(
        (name = "routes", description = "Route resolution and mutation"),
        (name = "audit", description = "Route change history"),
        (name = "system", description = "Health and readiness")
    )
)]
pub struct ApiDoc;
