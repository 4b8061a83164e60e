//! End-to-end pipeline tests against the in-memory adapters: HTTP API →
//! mutator → event log → consumers → cache/audit, plus drain behavior.
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use routeplane::app::{AppState, build_router};
use routeplane::audit::memory::InMemoryAuditStore;
use routeplane::cache::memory::InMemoryRouteCache;
use routeplane::cache::{CacheLookup, RouteCache};
use routeplane::consumers::{AuditWriter, CacheInvalidator, CacheWarmer};
use routeplane::events::memory::InMemoryEventLog;
use routeplane::events::EventHandler;
use routeplane::model::{RouteAction, RouteKey};
use routeplane::resilience::ResilienceKernel;
use routeplane::service::{Mutator, Resolver};
use routeplane::store::memory::InMemoryRouteStore;
use routeplane::store::RouteStore;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct Harness {
    app: Router,
    store: Arc<InMemoryRouteStore>,
    cache: Arc<InMemoryRouteCache>,
    log: Arc<InMemoryEventLog>,
    audit: Arc<InMemoryAuditStore>,
    kernel: Arc<ResilienceKernel>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryRouteStore::new());
    let cache = Arc::new(InMemoryRouteCache::new(
        Duration::from_secs(60),
        Duration::from_secs(10),
    ));
    let log = Arc::new(InMemoryEventLog::new());
    let audit = Arc::new(InMemoryAuditStore::new());
    let kernel = ResilienceKernel::new();
    let state = AppState {
        resolver: Arc::new(Resolver::new(store.clone(), cache.clone())),
        mutator: Arc::new(Mutator::new(store.clone(), log.clone())),
        store: store.clone(),
        cache: cache.clone(),
        publisher: log.clone(),
        audit: audit.clone(),
        kernel: kernel.clone(),
    };
    Harness {
        app: build_router(state),
        store,
        cache,
        log,
        audit,
        kernel,
    }
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Deliver every published event to the given handlers, in order.
async fn fan_out(log: &InMemoryEventLog, handlers: &[&dyn EventHandler]) {
    for event in log.events().await {
        for handler in handlers {
            handler.handle(&event).await.expect("handler");
        }
    }
}

const RESOLVE_V2: &str =
    "/api/v1/routes/resolve?tenant=team-a&service=payments&env=prod&version=v2";

fn create_v2_body() -> serde_json::Value {
    serde_json::json!({
        "tenant": "team-a",
        "service": "payments",
        "env": "prod",
        "version": "v2",
        "url": "https://p/v2",
        "changed_by": "alice"
    })
}

#[tokio::test]
async fn create_then_resolve() {
    let h = harness();

    let response = h
        .app
        .clone()
        .oneshot(json_request("POST", "/api/v1/routes", create_v2_body()))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json(response).await;
    assert_eq!(payload["outcome"], "created");
    assert_eq!(payload["url"], "https://p/v2");
    assert_eq!(payload["is_active"], true);

    let response = h.app.clone().oneshot(get_request(RESOLVE_V2)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let correlation = response
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .expect("correlation header");
    assert!(correlation.starts_with("req-"));
    let payload = read_json(response).await;
    assert_eq!(payload["url"], "https://p/v2");
    assert_eq!(payload["correlation_id"], correlation.as_str());

    // The resolution populated the cache.
    let key = RouteKey::new("team-a", "payments", "prod", "v2");
    assert_eq!(
        h.cache.lookup(&key).await.unwrap(),
        CacheLookup::Hit("https://p/v2".into())
    );
}

#[tokio::test]
async fn supplied_correlation_id_is_adopted_and_mirrored() {
    let h = harness();
    let request = Request::builder()
        .uri(RESOLVE_V2)
        .header("x-correlation-id", "req-cafef00dcafef00d")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response
            .headers()
            .get("x-correlation-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-cafef00dcafef00d")
    );
    let payload = read_json(response).await;
    assert_eq!(payload["correlation_id"], "req-cafef00dcafef00d");
    assert!(payload["error"].as_str().unwrap().contains("no active route"));
}

#[tokio::test]
async fn conflict_on_recreate_with_different_url() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(json_request("POST", "/api/v1/routes", create_v2_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let mut body = create_v2_body();
    body["url"] = serde_json::json!("https://other");
    let response = h
        .app
        .clone()
        .oneshot(json_request("POST", "/api/v1/routes", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Stored URL unchanged.
    let response = h.app.clone().oneshot(get_request(RESOLVE_V2)).await.unwrap();
    let payload = read_json(response).await;
    assert_eq!(payload["url"], "https://p/v2");

    // Idempotent replay with the original URL is accepted.
    let response = h
        .app
        .clone()
        .oneshot(json_request("POST", "/api/v1/routes", create_v2_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["outcome"], "already_exists");
}

#[tokio::test]
async fn deactivate_propagates_through_the_event_fan_out() {
    let h = harness();
    h.app
        .clone()
        .oneshot(json_request("POST", "/api/v1/routes", create_v2_body()))
        .await
        .unwrap();

    // Warm the cache via a resolution.
    let response = h.app.clone().oneshot(get_request(RESOLVE_V2)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/routes/deactivate",
            serde_json::json!({
                "tenant": "team-a", "service": "payments", "env": "prod", "version": "v2"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["outcome"], "deactivated");

    // Before invalidation the stale positive entry may still be served.
    let response = h.app.clone().oneshot(get_request(RESOLVE_V2)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Drive the consumers over the published events.
    let invalidator = CacheInvalidator::new(h.cache.clone());
    let audit_writer = AuditWriter::new(h.audit.clone());
    fan_out(&h.log, &[&invalidator, &audit_writer]).await;

    // After invalidation the resolution re-reads the store and misses.
    let response = h.app.clone().oneshot(get_request(RESOLVE_V2)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Exactly one audit document per committed mutation, even if we replay.
    fan_out(&h.log, &[&audit_writer]).await;
    assert_eq!(h.audit.len().await, 2);

    let response = h
        .app
        .clone()
        .oneshot(get_request(
            "/api/v1/audit/routes?tenant=team-a&service=payments&env=prod&version=v2",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    let items = payload["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    // Newest first.
    assert_eq!(items[0]["action"], "deactivated");
    assert_eq!(items[1]["action"], "created");
    assert_eq!(items[1]["changed_by"], "alice");
}

#[tokio::test]
async fn warmer_populates_cache_from_created_events() {
    let h = harness();
    h.app
        .clone()
        .oneshot(json_request("POST", "/api/v1/routes", create_v2_body()))
        .await
        .unwrap();

    let warmer = CacheWarmer::new(h.cache.clone());
    fan_out(&h.log, &[&warmer]).await;

    let key = RouteKey::new("team-a", "payments", "prod", "v2");
    assert_eq!(
        h.cache.lookup(&key).await.unwrap(),
        CacheLookup::Hit("https://p/v2".into())
    );
    assert_eq!(h.log.events().await[0].action, RouteAction::Created);
}

#[tokio::test]
async fn activate_unknown_route_is_404_and_empty_url_is_400() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/routes/activate",
            serde_json::json!({
                "tenant": "team-a", "service": "payments", "env": "prod", "version": "v9"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let mut body = create_v2_body();
    body["url"] = serde_json::json!("   ");
    let response = h
        .app
        .clone()
        .oneshot(json_request("POST", "/api/v1/routes", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(h.store.resolve_active_url(&RouteKey::new("team-a", "payments", "prod", "v2"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn invalid_audit_action_is_400() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(get_request("/api/v1/audit/routes?action=exploded"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn draining_rejects_api_work_but_health_stays_up() {
    let h = harness();
    h.kernel.drainer.start_draining();

    let response = h.app.clone().oneshot(get_request(RESOLVE_V2)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let payload = read_json(response).await;
    assert!(payload["error"].as_str().unwrap().contains("draining"));

    let response = h
        .app
        .clone()
        .oneshot(get_request("/health/ready"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let payload = read_json(response).await;
    assert_eq!(payload["status"], "not_ready");
    assert_eq!(payload["draining"], true);

    let response = h
        .app
        .clone()
        .oneshot(get_request("/health/live"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The drainer saw no admitted work, so the drain completes immediately.
    assert!(h.kernel.drainer.wait_for_drain(Duration::from_millis(50)).await);
    assert_eq!(h.kernel.drainer.in_flight(), 0);
}

#[tokio::test]
async fn readiness_reports_adapter_statuses() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(get_request("/health/ready"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["status"], "ready");
    assert_eq!(payload["checks"]["record_store"], "healthy");
    assert_eq!(payload["checks"]["cache"], "healthy");
    assert_eq!(payload["checks"]["event_log"], "healthy");
    assert_eq!(payload["checks"]["audit_store"], "healthy");
}

#[tokio::test]
async fn resilience_snapshot_is_served() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(get_request("/health/resilience"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert!(payload["circuit_breakers"].as_array().unwrap().len() >= 4);
    assert_eq!(payload["graceful_draining"]["draining"], false);
}
