//! Prometheus metrics setup and metric definitions

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    // Log searches may legitimately run for tens of seconds
    let buckets = [
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus output
/// includes HELP/TYPE lines for all metrics from startup (not just after first use).
pub fn describe_metrics() {
    // HTTP metrics
    describe_counter!("logboard_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "logboard_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "logboard_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    // Search metrics
    describe_counter!(
        "logboard_log_searches_total",
        "Log searches by outcome (ok/timeout/superseded/error)"
    );
    describe_histogram!(
        "logboard_log_search_duration_seconds",
        "Log search database time in seconds"
    );
    describe_counter!(
        "logboard_query_timeouts_total",
        "Queries that exceeded their deadline, by endpoint"
    );

    // Auth metrics
    describe_counter!(
        "logboard_auth_login_total",
        "Discord login attempts by result"
    );
    describe_counter!(
        "logboard_sessions_swept_total",
        "Expired sessions removed by the background sweep"
    );

    counter!("logboard_log_searches_total", "result" => "ok").absolute(0);
    counter!("logboard_query_timeouts_total", "endpoint" => "logs").absolute(0);
    counter!("logboard_query_timeouts_total", "endpoint" => "actions").absolute(0);
    counter!("logboard_auth_login_total", "result" => "success").absolute(0);
    counter!("logboard_sessions_swept_total").absolute(0);
    gauge!("logboard_http_requests_in_flight").set(0.0);
}
