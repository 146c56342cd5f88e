//! Log search and action suggestion business logic

use super::deadline::{InFlightSearches, QueryDeadline};
use crate::config::QueryTimeouts;
use crate::domain::{ActionSuggestion, LogEntry, SearchFilter, SuggestionQuery};
use crate::error::{AppError, Result};
use crate::repository::LogRepository;
use chrono::Utc;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// `/api/logs` response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogPage {
    pub logs: Vec<LogEntry>,
    pub page: i64,
    /// Database time in milliseconds
    #[serde(rename = "queryTime")]
    pub query_time: u64,
    /// Server clock at response time, epoch milliseconds
    pub time: i64,
}

pub struct LogSearchService<R: LogRepository> {
    log_repo: Arc<R>,
    timeouts: QueryTimeouts,
    in_flight: InFlightSearches,
}

fn outcome_label<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(AppError::QueryTimeout(_)) => "timeout",
        Err(AppError::Superseded) => "superseded",
        Err(_) => "error",
    }
}

impl<R: LogRepository> LogSearchService<R> {
    pub fn new(log_repo: Arc<R>, timeouts: QueryTimeouts) -> Self {
        Self {
            log_repo,
            timeouts,
            in_flight: InFlightSearches::new(),
        }
    }

    /// Run a filtered search for `scope` (the caller's session).
    ///
    /// A newer search in the same scope cancels this one.
    pub async fn search(&self, scope: &str, filter: &SearchFilter) -> Result<LogPage> {
        let ticket = self.in_flight.begin(format!("logs:{}", scope));
        let deadline = QueryDeadline::new(self.timeouts.log_search);

        let started = Instant::now();
        let result = deadline
            .run(
                ticket.token(),
                self.log_repo.search(filter, deadline.budget()),
            )
            .await;
        let elapsed = started.elapsed();

        let outcome = outcome_label(&result);
        counter!("logboard_log_searches_total", "result" => outcome).increment(1);
        histogram!("logboard_log_search_duration_seconds").record(elapsed.as_secs_f64());
        if outcome == "timeout" {
            counter!("logboard_query_timeouts_total", "endpoint" => "logs").increment(1);
        }

        let logs = result?;
        let query_time = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(
            rows = logs.len(),
            page = filter.page.number(),
            query_time_ms = query_time,
            "Log search completed"
        );

        Ok(LogPage {
            logs,
            page: filter.page.number(),
            query_time,
            time: Utc::now().timestamp_millis(),
        })
    }

    /// Actions matching `query`; an absent term yields no suggestions
    pub async fn suggest_actions(
        &self,
        scope: &str,
        query: Option<&SuggestionQuery>,
    ) -> Result<Vec<ActionSuggestion>> {
        let Some(query) = query else {
            return Ok(Vec::new());
        };

        let ticket = self.in_flight.begin(format!("actions:{}", scope));
        let deadline = QueryDeadline::new(self.timeouts.action_suggest);

        let result = deadline
            .run(
                ticket.token(),
                self.log_repo.suggest_actions(query, deadline.budget()),
            )
            .await;

        if matches!(result, Err(AppError::QueryTimeout(_))) {
            counter!("logboard_query_timeouts_total", "endpoint" => "actions").increment(1);
        }

        result
    }

    /// Database reachability for readiness probes
    pub async fn ping(&self) -> Result<()> {
        self.log_repo.ping().await
    }
}
