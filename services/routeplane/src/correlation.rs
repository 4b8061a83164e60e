//! Correlation id propagation.
//!
//! Every request is bound to a correlation id: adopted from the
//! `X-Correlation-ID` header when the caller supplies one, generated
//! otherwise. The id lives in a task-local so adapters, the publisher, and
//! consumers can read it without threading it through signatures, and it is
//! mirrored on every response so client logs can cross-reference.
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

tokio::task_local! {
    static CORRELATION_ID: String;
}

/// Opaque id, `req-` plus 16 hex characters.
pub fn generate() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("req-{}", &hex[..16])
}

/// The correlation id bound to the current task, if any.
pub fn current() -> Option<String> {
    CORRELATION_ID.try_with(|id| id.clone()).ok()
}

/// Run `fut` with `id` bound as the task-local correlation id.
pub async fn scope<F>(id: String, fut: F) -> F::Output
where
    F: std::future::Future,
{
    CORRELATION_ID.scope(id, fut).await
}

/// Axum middleware: bind the correlation id for the request, record it on
/// the request span, and echo it back on the response.
pub async fn middleware(request: Request, next: Next) -> Response {
    let supplied = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(str::to_owned);
    if supplied.is_some() {
        metrics::counter!("routeplane_correlation_ids_provided_total").increment(1);
    } else {
        metrics::counter!("routeplane_correlation_ids_generated_total").increment(1);
    }
    let id = supplied.unwrap_or_else(generate);

    let span = tracing::info_span!("request", correlation_id = %id);
    let mut response = scope(id.clone(), next.run(request).instrument(span)).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(CORRELATION_HEADER), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_have_prefix_and_hex_suffix() {
        let id = generate();
        assert!(id.starts_with("req-"));
        let suffix = &id[4..];
        assert_eq!(suffix.len(), 16);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(generate(), id);
    }

    #[tokio::test]
    async fn scope_binds_and_unbinds() {
        assert_eq!(current(), None);
        let seen = scope("req-abc123abc123abcd".into(), async { current() }).await;
        assert_eq!(seen.as_deref(), Some("req-abc123abc123abcd"));
        assert_eq!(current(), None);
    }
}
