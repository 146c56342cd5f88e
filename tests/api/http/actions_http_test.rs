//! Action suggestion HTTP tests

use super::{build_test_router, create_test_config, get_json, TestAppState};
use crate::api::{log_entry, OPERATOR_ID};
use axum::http::StatusCode;
use serde_json::json;
use std::time::Duration;

async fn seeded_state() -> TestAppState {
    let state = TestAppState::offline();
    let actions = [
        "Player Killed",
        "Player Killed",
        "Killed Player",
        "Killed Player",
        "Killed Player",
        "Kill",
        "Vehicle Spawned",
    ];
    for (id, action) in actions.iter().enumerate() {
        state
            .log_repo
            .add(log_entry(id as i64, "p", action, "", json!({}), 1_700_000_000))
            .await;
    }
    state
}

#[tokio::test]
async fn test_missing_term_returns_empty_list() {
    let state = seeded_state().await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (status, body) = get_json(&app, "/api/actions", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = get_json(&app, "/api/actions?search=%20%20", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_short_term_matches_anywhere_prefix_ranked_first() {
    let state = seeded_state().await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (status, body) = get_json(&app, "/api/actions?search=ki", Some(&cookie)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"action": "Killed Player", "count": 3},
            {"action": "Kill", "count": 1},
            {"action": "Player Killed", "count": 2}
        ])
    );
}

#[tokio::test]
async fn test_longer_term_is_prefix_with_exact_first() {
    let state = seeded_state().await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (status, body) = get_json(&app, "/api/actions?search=Kill", Some(&cookie)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"action": "Kill", "count": 1},
            {"action": "Killed Player", "count": 3}
        ])
    );
}

#[tokio::test]
async fn test_suggestions_require_session() {
    let state = seeded_state().await;
    let app = build_test_router(state);

    let (status, body) = get_json(&app, "/api/actions?search=kill", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_suggestion_timeout_returns_504() {
    let mut config = create_test_config("http://127.0.0.1:9");
    config.query_timeouts.action_suggest = Duration::from_millis(50);
    let state = TestAppState::with_config(config);
    state.log_repo.set_delay(Some(Duration::from_millis(500)));
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (status, _) = get_json(&app, "/api/actions?search=kill", Some(&cookie)).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}
