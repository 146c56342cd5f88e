//! Log search HTTP tests

use super::{build_test_router, create_test_config, get, get_json, TestAppState};
use crate::api::{log_entry, OPERATOR_ID};
use axum::http::{header, StatusCode};
use logboard_core::domain::TextMatch;
use serde_json::json;
use std::time::Duration;

async fn seeded_state() -> TestAppState {
    let state = TestAppState::offline();
    let repo = &state.log_repo;

    repo.add(log_entry(
        1,
        "license:abcdef0123456789abcdef0123456789",
        "Player Joined",
        "connected from 10.0.0.1",
        json!({"playerServerId": 12, "minigames": []}),
        1_700_000_100,
    ))
    .await;
    repo.add(log_entry(
        2,
        "license:abcdef0123456789abcdef0123456789",
        "Player Died",
        "fell from a great height",
        json!({"playerServerId": 12, "minigames": ["parkour"]}),
        1_700_000_200,
    ))
    .await;
    repo.add(log_entry(
        3,
        "discord:4242",
        "Player Killed",
        "shot by license:ffff",
        json!({"playerServerId": "7", "minigames": []}),
        1_700_000_300,
    ))
    .await;
    repo.add(log_entry(
        4,
        "discord:4242",
        "Vehicle Spawned",
        "adder",
        json!({"playerServerId": 7}),
        1_700_000_400,
    ))
    .await;

    state
}

fn ids(body: &serde_json::Value) -> Vec<i64> {
    body["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_search_returns_newest_first() {
    let state = seeded_state().await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (status, body) = get_json(&app, "/api/logs", Some(&cookie)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![4, 3, 2, 1]);
    assert_eq!(body["page"], 1);
    assert!(body["queryTime"].is_u64());
    assert!(body["time"].as_i64().unwrap() > 1_700_000_000_000);
}

#[tokio::test]
async fn test_metadata_is_decoded() {
    let state = seeded_state().await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (_, body) = get_json(&app, "/api/logs?action=%3DPlayer%20Died", Some(&cookie)).await;

    assert_eq!(ids(&body), vec![2]);
    assert_eq!(body["logs"][0]["metadata"]["minigames"], json!(["parkour"]));
}

#[tokio::test]
async fn test_identifier_license_prefix() {
    let state = seeded_state().await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let repo = state.log_repo.clone();
    let app = build_test_router(state);

    let (status, body) =
        get_json(&app, "/api/logs?identifier=license:abcdef", Some(&cookie)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![2, 1]);
    assert_eq!(
        repo.searches()[0].identifier,
        Some(TextMatch::Prefix("license:abcdef".to_string()))
    );
}

#[tokio::test]
async fn test_action_alternatives() {
    let state = seeded_state().await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (_, body) = get_json(
        &app,
        "/api/logs?action=%3DPlayer%20Killed%7Cvehicle",
        Some(&cookie),
    )
    .await;

    assert_eq!(ids(&body), vec![4, 3]);
}

#[tokio::test]
async fn test_exact_action_is_subset_of_loose_match() {
    let state = TestAppState::offline();
    state
        .log_repo
        .add(log_entry(1, "p", "Player Killed", "", json!({}), 1_700_000_100))
        .await;
    state
        .log_repo
        .add(log_entry(2, "p", "Player Killed Twice", "", json!({}), 1_700_000_200))
        .await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (_, exact) = get_json(&app, "/api/logs?action=%3DPlayer%20Killed", Some(&cookie)).await;
    let (_, loose) = get_json(&app, "/api/logs?action=Player%20Killed", Some(&cookie)).await;

    assert_eq!(ids(&exact), vec![1]);
    assert_eq!(ids(&loose), vec![2, 1]);
    assert!(ids(&exact).iter().all(|id| ids(&loose).contains(id)));
}

#[tokio::test]
async fn test_minigame_deaths_hidden() {
    let state = seeded_state().await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (_, body) = get_json(&app, "/api/logs?minigames=none", Some(&cookie)).await;

    // Row 2 is a death inside a minigame
    assert_eq!(ids(&body), vec![4, 3, 1]);
}

#[tokio::test]
async fn test_server_and_time_window() {
    let state = seeded_state().await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (_, body) = get_json(&app, "/api/logs?server=7", Some(&cookie)).await;
    assert_eq!(ids(&body), vec![4, 3]);

    let (_, body) = get_json(
        &app,
        "/api/logs?after=1700000100&before=1700000400",
        Some(&cookie),
    )
    .await;
    assert_eq!(ids(&body), vec![3, 2]);
}

#[tokio::test]
async fn test_contradictory_time_window_is_empty() {
    let state = seeded_state().await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (status, body) = get_json(
        &app,
        "/api/logs?before=1700000100&after=1700000400",
        Some(&cookie),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logs"], json!([]));
}

#[tokio::test]
async fn test_short_details_ignored_without_other_filters() {
    let state = seeded_state().await;
    let cookie = state.login_as(OPERATOR_ID).await;
    let repo = state.log_repo.clone();
    let app = build_test_router(state);

    let (_, body) = get_json(&app, "/api/logs?details=a%20b%20", Some(&cookie)).await;
    assert_eq!(ids(&body).len(), 4);
    assert_eq!(repo.searches()[0].details, None);

    let (_, body) = get_json(&app, "/api/logs?details=adder", Some(&cookie)).await;
    assert_eq!(ids(&body), vec![4]);
}

#[tokio::test]
async fn test_pagination() {
    let state = TestAppState::offline();
    for id in 1..=45 {
        state
            .log_repo
            .add(log_entry(id, "p", "Tick", "t", json!({}), 1_700_000_000 + id))
            .await;
    }
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (_, first) = get_json(&app, "/api/logs", Some(&cookie)).await;
    assert_eq!(ids(&first).len(), 30);
    assert_eq!(ids(&first)[0], 45);

    let (_, second) = get_json(&app, "/api/logs?page=2", Some(&cookie)).await;
    assert_eq!(second["page"], 2);
    assert_eq!(ids(&second), (1..=15).rev().collect::<Vec<_>>());

    let (_, clamped) = get_json(&app, "/api/logs?page=-3", Some(&cookie)).await;
    assert_eq!(clamped["page"], 1);

    let (_, garbage) = get_json(&app, "/api/logs?page=abc", Some(&cookie)).await;
    assert_eq!(garbage["page"], 1);
}

#[tokio::test]
async fn test_search_timeout_returns_504() {
    let mut config = create_test_config("http://127.0.0.1:9");
    config.query_timeouts.log_search = Duration::from_millis(50);
    let state = TestAppState::with_config(config);
    state.log_repo.set_delay(Some(Duration::from_millis(500)));
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (status, body) = get_json(&app, "/api/logs", Some(&cookie)).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        body["error"],
        "Query timeout - try refining your search filters"
    );
}

#[tokio::test]
async fn test_newer_search_supersedes_older() {
    let state = TestAppState::offline();
    state.log_repo.set_delay(Some(Duration::from_millis(300)));
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let first = {
        let app = app.clone();
        let cookie = cookie.clone();
        tokio::spawn(async move { get_json(&app, "/api/logs?page=1", Some(&cookie)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let (second_status, second_body) = get_json(&app, "/api/logs?page=2", Some(&cookie)).await;
    let (first_status, first_body) = first.await.unwrap();

    assert_eq!(first_status, StatusCode::CONFLICT);
    assert_eq!(first_body["error"], "Request superseded");
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(second_body["page"], 2);
}

#[tokio::test]
async fn test_searches_from_different_sessions_do_not_interfere() {
    let state = TestAppState::offline();
    state.log_repo.set_delay(Some(Duration::from_millis(200)));
    let alice = state.login_as(OPERATOR_ID).await;
    let bob = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let first = {
        let app = app.clone();
        tokio::spawn(async move { get_json(&app, "/api/logs", Some(&alice)).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    let (second_status, _) = get_json(&app, "/api/logs", Some(&bob)).await;
    let (first_status, _) = first.await.unwrap();

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
}

#[tokio::test]
async fn test_database_failure_is_generic_500() {
    let state = TestAppState::offline();
    state.log_repo.set_failing(true);
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let (status, body) = get_json(&app, "/api/logs", Some(&cookie)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_api_responses_are_not_cached() {
    let state = TestAppState::offline();
    let cookie = state.login_as(OPERATOR_ID).await;
    let app = build_test_router(state);

    let response = get(&app, "/api/logs", Some(&cookie)).await;

    assert!(response.headers()[header::CACHE_CONTROL]
        .to_str()
        .unwrap()
        .starts_with("no-store"));
    assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
    assert!(response.headers().contains_key("x-request-id"));
}
