//! Audit log repository

use super::log_query::{build_action_suggest, build_log_search};
use crate::domain::{ActionSuggestion, LogEntry, LogRow, SearchFilter, SuggestionQuery};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::mysql::MySqlDatabaseError;
use sqlx::{Executor, MySqlConnection, MySqlPool};
use std::time::Duration;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LogRepository: Send + Sync {
    /// One page of matching rows, newest first.
    ///
    /// `budget` is forwarded to the server as a statement time limit.
    async fn search(&self, filter: &SearchFilter, budget: Duration) -> Result<Vec<LogEntry>>;

    /// Up to ten distinct actions matching the term
    async fn suggest_actions(
        &self,
        query: &SuggestionQuery,
        budget: Duration,
    ) -> Result<Vec<ActionSuggestion>>;

    async fn ping(&self) -> Result<()>;
}

pub struct LogRepositoryImpl {
    pool: MySqlPool,
}

impl LogRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// ER_QUERY_TIMEOUT: statement aborted by `max_execution_time`
const ER_QUERY_TIMEOUT: u16 = 3024;

/// Headroom so the client deadline normally fires before the server limit
const SERVER_LIMIT_MARGIN: Duration = Duration::from_millis(500);

fn server_statement_limit(budget: Duration) -> Duration {
    budget + SERVER_LIMIT_MARGIN
}

/// Ask the server to abort SELECTs on this connection shortly after `budget`.
///
/// Servers without `max_execution_time` reject the statement; the client
/// deadline still applies in that case.
async fn limit_execution_time(conn: &mut MySqlConnection, budget: Duration) {
    let sql = format!(
        "SET SESSION max_execution_time = {}",
        server_statement_limit(budget).as_millis()
    );
    if let Err(e) = (&mut *conn).execute(sql.as_str()).await {
        tracing::debug!("Could not set max_execution_time: {}", e);
    }
}

fn mysql_error_number(err: &sqlx::Error) -> Option<u16> {
    match err {
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(MySqlDatabaseError::number),
        _ => None,
    }
}

fn classify_query_error(number: Option<u16>, err: sqlx::Error, budget: Duration) -> AppError {
    match number {
        Some(ER_QUERY_TIMEOUT) => AppError::QueryTimeout(budget.as_millis() as u64),
        _ => AppError::Database(err),
    }
}

/// A server-side statement timeout is reported the same way as the client deadline
fn map_query_error(err: sqlx::Error, budget: Duration) -> AppError {
    let number = mysql_error_number(&err);
    classify_query_error(number, err, budget)
}

#[async_trait]
impl LogRepository for LogRepositoryImpl {
    async fn search(&self, filter: &SearchFilter, budget: Duration) -> Result<Vec<LogEntry>> {
        let query = build_log_search(filter);

        // Dropping the connection (including on cancellation) returns it to the pool
        let mut conn = self.pool.acquire().await?;
        limit_execution_time(&mut conn, budget).await;

        let rows = query
            .query_as::<LogRow>()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_query_error(e, budget))?;

        Ok(rows.into_iter().map(LogEntry::from).collect())
    }

    async fn suggest_actions(
        &self,
        query: &SuggestionQuery,
        budget: Duration,
    ) -> Result<Vec<ActionSuggestion>> {
        let built = build_action_suggest(query);

        let mut conn = self.pool.acquire().await?;
        limit_execution_time(&mut conn, budget).await;

        let suggestions = built
            .query_as::<ActionSuggestion>()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_query_error(e, budget))?;

        Ok(suggestions)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
