//! Application state traits for dependency injection
//!
//! Handlers and middleware are generic over [`HasServices`] so the same
//! router runs against MySQL in production and in-memory stores in tests.

use crate::config::Config;
use crate::discord::DiscordOAuthClient;
use crate::repository::{LogRepository, SessionRepository};
use crate::service::{LogSearchService, SessionService};
use metrics_exporter_prometheus::PrometheusHandle;

/// Trait for application state that provides access to all services.
pub trait HasServices: Clone + Send + Sync + 'static {
    /// The audit log repository type
    type LogRepo: LogRepository;
    /// The session store type
    type SessionRepo: SessionRepository;

    /// Get the application configuration
    fn config(&self) -> &Config;

    /// Get the log search service
    fn log_search_service(&self) -> &LogSearchService<Self::LogRepo>;

    /// Get the session service
    fn session_service(&self) -> &SessionService<Self::SessionRepo>;

    /// Get the Discord OAuth client
    fn discord_client(&self) -> &DiscordOAuthClient;

    /// Prometheus handle when metrics are enabled
    fn prometheus_handle(&self) -> Option<&PrometheusHandle>;

    /// Check if the system is ready (database reachable)
    fn check_ready(&self) -> impl std::future::Future<Output = bool> + Send;
}
