//! Error-to-status mapping, in one place.
//!
//! `NotFound` → 404, validation → 400, conflict → 409, load-shedding and
//! unavailability → 503, everything else → 500. Bodies carry the `error`
//! field and the correlation id of the request.
use crate::api::types::ErrorResponse;
use crate::correlation;
use crate::error::RoutingError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: message.into(),
                correlation_id: correlation::current(),
            },
        }
    }
}

impl From<RoutingError> for ApiError {
    fn from(err: RoutingError) -> Self {
        let status = match &err {
            RoutingError::Validation(_) => StatusCode::BAD_REQUEST,
            RoutingError::NotFound => StatusCode::NOT_FOUND,
            RoutingError::Conflict(_) => StatusCode::CONFLICT,
            RoutingError::Unavailable(_) | RoutingError::Shed(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RoutingError::Internal(source) => {
                tracing::error!(error = ?source, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError::new(status, err.to_string())
    }
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, message)
}
