//! Session store
//!
//! Rows follow the common `sessions(session_id, expires, data)` layout so an
//! existing session table can be shared.

use crate::domain::Operator;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

/// Server-side session payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub operator: Operator,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create the table when missing
    async fn ensure_table(&self) -> Result<()>;

    /// Insert or replace a session expiring at `expires` (epoch seconds)
    async fn save(&self, session_id: &str, data: &SessionData, expires: i64) -> Result<()>;

    /// Session still valid at `now` (epoch seconds)
    async fn find_active(&self, session_id: &str, now: i64) -> Result<Option<SessionData>>;

    async fn destroy(&self, session_id: &str) -> Result<()>;

    /// Purge sessions expired at `now`, returning the number removed
    async fn delete_expired(&self, now: i64) -> Result<u64>;
}

pub struct SessionRepositoryImpl {
    pool: MySqlPool,
}

impl SessionRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for SessionRepositoryImpl {
    async fn ensure_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id VARCHAR(128) COLLATE utf8mb4_bin NOT NULL,
                expires INT(11) UNSIGNED NOT NULL,
                data MEDIUMTEXT COLLATE utf8mb4_bin,
                PRIMARY KEY (session_id)
            ) ENGINE=InnoDB
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, session_id: &str, data: &SessionData, expires: i64) -> Result<()> {
        let payload = serde_json::to_string(data)
            .map_err(|e| anyhow::anyhow!("Failed to encode session: {}", e))?;

        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, expires, data)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE expires = VALUES(expires), data = VALUES(data)
            "#,
        )
        .bind(session_id)
        .bind(expires)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_active(&self, session_id: &str, now: i64) -> Result<Option<SessionData>> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            r#"
            SELECT data
            FROM sessions
            WHERE session_id = ? AND expires > ?
            "#,
        )
        .bind(session_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        let Some((Some(raw),)) = row else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                tracing::warn!("Discarding unreadable session payload: {}", e);
                Ok(None)
            }
        }
    }

    async fn destroy(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_expired(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
