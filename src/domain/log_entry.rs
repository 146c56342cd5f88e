//! Audit log domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of `user_logs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub identifier: Option<String>,
    pub action: Option<String>,
    pub details: Option<String>,
    /// Decoded JSON when the stored text parses, the raw string otherwise
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Raw row as stored; `metadata` is a text column
#[derive(Debug, Clone, FromRow)]
pub struct LogRow {
    pub id: i64,
    pub identifier: Option<String>,
    pub action: Option<String>,
    pub details: Option<String>,
    pub metadata: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<LogRow> for LogEntry {
    fn from(row: LogRow) -> Self {
        let metadata = row.metadata.map(|raw| {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        });

        Self {
            id: row.id,
            identifier: row.identifier,
            action: row.action,
            details: row.details,
            metadata,
            timestamp: row.timestamp,
        }
    }
}

impl LogEntry {
    /// Minigame names recorded in the metadata document, if any
    pub fn minigames(&self) -> Vec<String> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("minigames"))
            .and_then(|v| v.as_array())
            .map(|games| {
                games
                    .iter()
                    .filter_map(|g| g.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `playerServerId` from the metadata document, rendered as text
    pub fn player_server_id(&self) -> Option<String> {
        match self.metadata.as_ref()?.get("playerServerId")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Distinct action value with its occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ActionSuggestion {
    pub action: String,
    pub count: i64,
}
