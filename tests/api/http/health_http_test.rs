//! Health, readiness and metrics endpoint tests

use super::{body_text, build_test_router, get, get_json, TestAppState};
use axum::http::{header, StatusCode};

#[tokio::test]
async fn test_health() {
    let app = build_test_router(TestAppState::offline());

    let (status, body) = get_json(&app, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_ready_when_database_reachable() {
    let app = build_test_router(TestAppState::offline());

    let response = get(&app, "/ready", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ready");
}

#[tokio::test]
async fn test_not_ready_when_database_down() {
    let state = TestAppState::offline();
    state.log_repo.set_failing(true);
    let app = build_test_router(state);

    let response = get(&app, "/ready", None).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_text(response).await, "not_ready");
}

#[tokio::test]
async fn test_metrics_disabled() {
    let app = build_test_router(TestAppState::offline());

    let response = get(&app, "/metrics", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "Metrics not enabled");
}

#[tokio::test]
async fn test_pages_carry_security_headers() {
    let app = build_test_router(TestAppState::offline());

    let response = get(&app, "/login", None).await;
    let headers = response.headers();

    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert!(headers[header::CONTENT_SECURITY_POLICY]
        .to_str()
        .unwrap()
        .contains("object-src 'none'"));
    assert!(!headers.contains_key(header::CACHE_CONTROL));
    assert!(!headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
}
