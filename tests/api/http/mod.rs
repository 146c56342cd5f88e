//! HTTP API Handler Tests Infrastructure
//!
//! Key components:
//! - `TestAppState` - in-memory version of AppState implementing `HasServices`
//! - Uses production `build_router()` so the real handlers and middleware run
//! - Request helpers that carry the session cookie

pub mod actions_http_test;
pub mod gate_http_test;
pub mod health_http_test;
pub mod logs_http_test;

use super::{operator, TestLogRepository, TestSessionRepository};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use logboard_core::config::{
    AllowList, Config, DatabaseConfig, DiscordConfig, QueryTimeouts, SecurityHeadersConfig,
    SessionConfig, TelemetryConfig,
};
use logboard_core::discord::DiscordOAuthClient;
use logboard_core::server::build_router;
use logboard_core::service::{LogSearchService, SessionService};
use logboard_core::state::HasServices;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// ============================================================================
// Test Configuration
// ============================================================================

pub const SESSION_COOKIE: &str = "sessionId";

/// Test config pointing the Discord client at `discord_api_url`
pub fn create_test_config(discord_api_url: &str) -> Config {
    Config {
        http_host: "127.0.0.1".to_string(),
        http_port: 3000,
        production: false,
        database: DatabaseConfig {
            host: "localhost".to_string(),
            port: 3306,
            user: "test".to_string(),
            password: "test".to_string(),
            name: "logs".to_string(),
            max_connections: 1,
            acquire_timeout_secs: 1,
        },
        discord: DiscordConfig {
            client_id: "test-client".to_string(),
            client_secret: "test-client-secret".to_string(),
            callback_url: "http://localhost:3000/auth/discord/callback".to_string(),
            api_url: discord_api_url.to_string(),
            scopes: vec!["identify".to_string()],
        },
        session: SessionConfig {
            secret: "test-session-secret".to_string(),
            cookie_name: SESSION_COOKIE.to_string(),
            ttl_secs: 86_400,
            sweep_interval_secs: 900,
            secure_cookie: false,
        },
        allowed_users: AllowList::new([super::OPERATOR_ID]),
        query_timeouts: QueryTimeouts {
            log_search: Duration::from_secs(5),
            action_suggest: Duration::from_secs(5),
        },
        security_headers: SecurityHeadersConfig::default(),
        telemetry: TelemetryConfig::default(),
    }
}

// ============================================================================
// TestAppState
// ============================================================================

#[derive(Clone)]
pub struct TestAppState {
    pub config: Arc<Config>,
    pub log_repo: Arc<TestLogRepository>,
    pub session_repo: Arc<TestSessionRepository>,
    pub log_search_service: Arc<LogSearchService<TestLogRepository>>,
    pub session_service: Arc<SessionService<TestSessionRepository>>,
    pub discord_client: DiscordOAuthClient,
}

impl TestAppState {
    pub fn new(discord_api_url: &str) -> Self {
        Self::with_config(create_test_config(discord_api_url))
    }

    /// State whose Discord client is never expected to be called
    pub fn offline() -> Self {
        Self::new("http://127.0.0.1:9")
    }

    pub fn with_config(config: Config) -> Self {
        let log_repo = Arc::new(TestLogRepository::new());
        let session_repo = Arc::new(TestSessionRepository::new());

        Self {
            log_search_service: Arc::new(LogSearchService::new(
                log_repo.clone(),
                config.query_timeouts.clone(),
            )),
            session_service: Arc::new(SessionService::new(
                session_repo.clone(),
                config.session.clone(),
            )),
            discord_client: DiscordOAuthClient::new(config.discord.clone()),
            config: Arc::new(config),
            log_repo,
            session_repo,
        }
    }

    /// Open a session for `operator_id`; returns the `Cookie` header value
    pub async fn login_as(&self, operator_id: &str) -> String {
        let cookie = self
            .session_service
            .create_session(operator(operator_id), None)
            .await
            .unwrap();
        format!("{}={}", SESSION_COOKIE, cookie)
    }

    /// Store a session row directly, bypassing the signer
    pub async fn insert_session(&self, session_id: &str, operator_id: &str, expires: i64) {
        self.session_repo
            .insert(session_id, operator(operator_id), expires)
            .await;
    }
}

impl HasServices for TestAppState {
    type LogRepo = TestLogRepository;
    type SessionRepo = TestSessionRepository;

    fn config(&self) -> &Config {
        &self.config
    }

    fn log_search_service(&self) -> &LogSearchService<Self::LogRepo> {
        &self.log_search_service
    }

    fn session_service(&self) -> &SessionService<Self::SessionRepo> {
        &self.session_service
    }

    fn discord_client(&self) -> &DiscordOAuthClient {
        &self.discord_client
    }

    fn prometheus_handle(&self) -> Option<&PrometheusHandle> {
        None
    }

    async fn check_ready(&self) -> bool {
        self.log_search_service.ping().await.is_ok()
    }
}

/// Production router over the in-memory state
pub fn build_test_router(state: TestAppState) -> Router {
    build_router(state)
}

// ============================================================================
// HTTP Test Helpers
// ============================================================================

/// GET `path`, optionally with a `Cookie` header and extra headers
pub async fn get_with(
    app: &Router,
    path: &str,
    cookie: Option<&str>,
    extra_headers: &[(&str, &str)],
) -> Response {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    for (name, value) in extra_headers {
        builder = builder.header(*name, *value);
    }

    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: &Router, path: &str, cookie: Option<&str>) -> Response {
    get_with(app, path, cookie, &[]).await
}

/// GET and parse the JSON body
pub async fn get_json(
    app: &Router,
    path: &str,
    cookie: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let response = get(app, path, cookie).await;
    let status = response.status();
    let body = body_bytes(response).await;
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default()
        .to_vec()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// All `Set-Cookie` values on a response
pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

/// `name=value` pair of the cookie called `name`, as a browser would send it back
pub fn cookie_pair(response: &Response, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        let pair = cookie.split(';').next()?.trim().to_string();
        pair.starts_with(&format!("{}=", name)).then_some(pair)
    })
}

/// Session expiry one day out
pub fn tomorrow() -> i64 {
    Utc::now().timestamp() + 86_400
}
