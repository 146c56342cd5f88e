//! Session gate HTTP tests

use super::{
    body_text, build_test_router, get, get_json, get_with, location, set_cookies, tomorrow,
    TestAppState, SESSION_COOKIE,
};
use crate::api::{OPERATOR_ID, OUTSIDER_ID};
use axum::http::StatusCode;
use chrono::Utc;

#[tokio::test]
async fn test_dashboard_redirects_without_session() {
    let app = build_test_router(TestAppState::offline());

    let response = get(&app, "/", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_api_returns_401_json_without_session() {
    let app = build_test_router(TestAppState::offline());

    let (status, body) = get_json(&app, "/api/logs", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_xhr_to_page_gets_401() {
    let app = build_test_router(TestAppState::offline());

    let response = get_with(&app, "/", None, &[("X-Requested-With", "XMLHttpRequest")]).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dashboard_renders_escaped_operator_name() {
    let state = TestAppState::offline();
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let response = get(&app, "/", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Mod &lt;b&gt;"));
    assert!(!html.contains("Mod <b>"));
}

#[tokio::test]
async fn test_tampered_cookie_is_cleared() {
    let state = TestAppState::offline();
    let cookie = state.login_as(OPERATOR_ID).await;
    let tampered = format!("{}x", cookie);
    let app = build_test_router(state);

    let response = get(&app, "/", Some(&tampered)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    let cleared = set_cookies(&response);
    assert_eq!(cleared.len(), 1);
    assert!(cleared[0].starts_with(&format!("{}=;", SESSION_COOKIE)));
    assert!(cleared[0].contains("Max-Age=0"));
}

#[tokio::test]
async fn test_unsigned_cookie_is_rejected() {
    let state = TestAppState::offline();
    state
        .insert_session("raw-session-id", OPERATOR_ID, tomorrow())
        .await;
    let app = build_test_router(state);

    let (status, _) = get_json(
        &app,
        "/api/logs",
        Some(&format!("{}=raw-session-id", SESSION_COOKIE)),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let state = TestAppState::offline();
    let cookie = state.login_as(OPERATOR_ID).await;
    let session_id = cookie
        .strip_prefix(&format!("{}=", SESSION_COOKIE))
        .and_then(|value| value.rsplit_once('.'))
        .map(|(id, _)| id.to_string())
        .unwrap();
    state
        .insert_session(&session_id, OPERATOR_ID, Utc::now().timestamp() - 1)
        .await;
    let app = build_test_router(state);

    let (status, _) = get_json(&app, "/api/logs", Some(&cookie)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_operator_removed_from_allow_list_loses_access() {
    let state = TestAppState::offline();
    let cookie = state.login_as(OUTSIDER_ID).await;
    let sessions = state.session_repo.clone();
    assert_eq!(sessions.len().await, 1);
    let app = build_test_router(state);

    let response = get(&app, "/", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    assert_eq!(sessions.len().await, 0);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = build_test_router(TestAppState::offline());

    let (status, body) = get_json(&app, "/wp-admin", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}
