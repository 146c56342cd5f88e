//! Startup database checks
//!
//! Verifies connectivity, creates the session table and makes sure the
//! `user_logs` indexes the search relies on exist. Index creation failures are
//! logged and never abort startup.

use crate::repository::log_query::LOG_TABLE;
use crate::repository::SessionRepository;
use anyhow::{Context, Result};
use sqlx::{Executor, MySqlPool};
use tracing::{info, warn};

/// Index name and column list on `user_logs`
pub const LOG_INDEXES: &[(&str, &str)] = &[
    ("idx_identifier", "identifier"),
    ("idx_action", "action"),
    ("idx_details", "details(255)"),
    ("idx_metadata", "metadata(255)"),
    ("idx_timestamp", "timestamp"),
    ("idx_identifier_action", "identifier, action"),
    ("idx_identifier_timestamp", "identifier, timestamp DESC"),
    ("idx_action_timestamp", "action, timestamp DESC"),
    (
        "idx_identifier_action_timestamp",
        "identifier, action, timestamp DESC",
    ),
    ("idx_identifier_details", "identifier, details(100)"),
    ("idx_action_details", "action, details(100)"),
];

/// Fail fast when the database cannot be reached
pub async fn verify_connectivity(pool: &MySqlPool) -> Result<()> {
    pool.execute("SELECT 1")
        .await
        .context("Failed to connect to database")?;
    info!("Database connection verified");
    Ok(())
}

/// Run every startup check
pub async fn run_startup_checks<S: SessionRepository>(
    pool: &MySqlPool,
    session_repo: &S,
) -> Result<()> {
    verify_connectivity(pool).await?;

    session_repo
        .ensure_table()
        .await
        .context("Failed to create sessions table")?;
    info!("Session table ready");

    ensure_log_indexes(pool).await;
    Ok(())
}

/// Create any missing `user_logs` index
pub async fn ensure_log_indexes(pool: &MySqlPool) {
    let existing = match existing_indexes(pool).await {
        Ok(names) => names,
        Err(e) => {
            warn!("Could not read existing indexes on {}: {}", LOG_TABLE, e);
            return;
        }
    };

    let mut created = 0;
    for (name, statement) in missing_index_statements(&existing) {
        match pool.execute(statement.as_str()).await {
            Ok(_) => {
                created += 1;
                info!(index = name, "Created index on {}", LOG_TABLE);
            }
            Err(e) => warn!(index = name, "Failed to create index: {}", e),
        }
    }

    if created == 0 {
        info!("All {} indexes present", LOG_TABLE);
    }
}

async fn existing_indexes(pool: &MySqlPool) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar(
        r#"
        SELECT DISTINCT INDEX_NAME
        FROM information_schema.statistics
        WHERE table_schema = DATABASE() AND table_name = ?
        "#,
    )
    .bind(LOG_TABLE)
    .fetch_all(pool)
    .await
}

fn missing_index_statements(existing: &[String]) -> Vec<(&'static str, String)> {
    LOG_INDEXES
        .iter()
        .filter(|(name, _)| !existing.iter().any(|e| e.eq_ignore_ascii_case(name)))
        .map(|(name, columns)| {
            (
                *name,
                format!("CREATE INDEX {} ON {} ({})", name, LOG_TABLE, columns),
            )
        })
        .collect()
}
