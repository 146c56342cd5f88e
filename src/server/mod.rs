//! Server initialization and routing

use crate::api;
use crate::config::Config;
use crate::discord::DiscordOAuthClient;
use crate::middleware::{
    normalize_error_response, panic_response, require_session, security_headers_middleware,
    ErrorExposure, ObservabilityLayer, SanitizedMakeSpan,
};
use crate::migration;
use crate::repository::{log::LogRepositoryImpl, session::SessionRepositoryImpl};
use crate::service::{LogSearchService, SessionService};
use crate::state::HasServices;
use anyhow::Result;
use axum::{middleware::from_fn_with_state, routing::get, Router};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    trace::{DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::{info, Level};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub log_search_service: Arc<LogSearchService<LogRepositoryImpl>>,
    pub session_service: Arc<SessionService<SessionRepositoryImpl>>,
    pub discord_client: DiscordOAuthClient,
    pub prometheus_handle: Option<PrometheusHandle>,
}

impl HasServices for AppState {
    type LogRepo = LogRepositoryImpl;
    type SessionRepo = SessionRepositoryImpl;

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
        self.prometheus_handle.as_ref()
    }

    async fn check_ready(&self) -> bool {
        self.log_search_service.ping().await.is_ok()
    }
}

fn connect_options(config: &Config) -> MySqlConnectOptions {
    let db = &config.database;
    MySqlConnectOptions::new()
        .host(&db.host)
        .port(db.port)
        .username(&db.user)
        .password(&db.password)
        .database(&db.name)
}

/// Run the server
pub async fn run(config: Config, prometheus_handle: Option<PrometheusHandle>) -> Result<()> {
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect_with(connect_options(&config))
        .await?;

    info!(
        "Connected to database {}@{}:{}",
        config.database.name, config.database.host, config.database.port
    );

    let log_repo = Arc::new(LogRepositoryImpl::new(db_pool.clone()));
    let session_repo = Arc::new(SessionRepositoryImpl::new(db_pool.clone()));

    migration::run_startup_checks(&db_pool, session_repo.as_ref()).await?;

    let log_search_service = Arc::new(LogSearchService::new(
        log_repo,
        config.query_timeouts.clone(),
    ));
    let session_service = Arc::new(SessionService::new(
        session_repo,
        config.session.clone(),
    ));
    let discord_client = DiscordOAuthClient::new(config.discord.clone());

    info!(
        "Allow-list holds {} operator(s)",
        config.allowed_users.len()
    );

    let shutdown = CancellationToken::new();
    let sweep = tokio::spawn(sweep_sessions(
        session_service.clone(),
        Duration::from_secs(config.session.sweep_interval_secs),
        shutdown.clone(),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        db_pool: db_pool.clone(),
        log_search_service,
        session_service,
        discord_client,
        prometheus_handle,
    };

    let app = build_router(state);

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                _ = signal.cancelled() => {}
            }
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = sweep.await {
        tracing::warn!("Session sweep task ended abnormally: {}", e);
    }
    db_pool.close().await;
    info!("Server stopped");

    Ok(())
}

/// Periodically purge expired sessions until `shutdown` fires
async fn sweep_sessions(
    sessions: Arc<SessionService<SessionRepositoryImpl>>,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    // First tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => match sessions.sweep_expired().await {
                Ok(0) => tracing::debug!("No expired sessions to sweep"),
                Ok(removed) => {
                    counter!("logboard_sessions_swept_total").increment(removed);
                    info!(removed, "Swept expired sessions");
                }
                Err(e) => tracing::error!("Session sweep failed: {}", e),
            },
        }
    }
}

/// Build the HTTP router
///
/// `/`, `/api/logs` and `/api/actions` sit behind the session gate; login,
/// OAuth, logout and probe endpoints are public.
pub fn build_router<S: HasServices>(state: S) -> Router {
    let config = state.config();
    let production = config.is_production();
    let exposure = ErrorExposure {
        expose_details: !production,
    };
    let security_headers = config.security_headers.clone();

    let gated = Router::new()
        .route("/", get(api::pages::index))
        .route("/api/logs", get(api::logs::search_logs::<S>))
        .route("/api/actions", get(api::actions::suggest_actions::<S>))
        .route_layer(from_fn_with_state(state.clone(), require_session::<S>));

    let public = Router::new()
        .route("/login", get(api::auth::login_page::<S>))
        .route("/auth/discord", get(api::auth::discord_login::<S>))
        .route(
            "/auth/discord/callback",
            get(api::auth::discord_callback::<S>),
        )
        .route("/logout", get(api::auth::logout::<S>))
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        .route("/metrics", get(api::metrics::metrics_handler::<S>));

    let expose = exposure.expose_details;
    let router = gated
        .merge(public)
        .with_state(state)
        .layer(CatchPanicLayer::custom(
            move |err: Box<dyn Any + Send + 'static>| panic_response(err, expose),
        ))
        .layer(from_fn_with_state(exposure, normalize_error_response))
        .layer(from_fn_with_state(
            security_headers,
            security_headers_middleware,
        ))
        .layer(ObservabilityLayer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(SanitizedMakeSpan)
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        );

    if production {
        router.layer(CompressionLayer::new())
    } else {
        router
    }
}
