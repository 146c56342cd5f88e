//! SQL text and bind parameters for log queries
//!
//! Every user-supplied value ends up in `params` and is bound positionally;
//! only fixed fragments are written into `sql`.

use crate::domain::{
    SearchFilter, SuggestionQuery, TextMatch, DEATH_ACTIONS, EMPTY_MINIGAMES_PATTERN,
};
use sqlx::mysql::{MySql, MySqlArguments, MySqlRow};
use sqlx::query::QueryAs;
use sqlx::FromRow;

/// Table holding the audit log
pub const LOG_TABLE: &str = "user_logs";
const LOG_COLUMNS: &str = "id, identifier, action, details, metadata, timestamp";
/// Suggestions returned per lookup
pub const SUGGESTION_LIMIT: i64 = 10;

/// A positional bind parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

/// Parameterized statement ready to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl BuiltQuery {
    fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    fn bind(&mut self, param: impl Into<SqlParam>) -> &mut Self {
        self.params.push(param.into());
        self
    }

    /// Prepare a typed query with all parameters bound in order
    pub fn query_as<'q, O>(&'q self) -> QueryAs<'q, MySql, O, MySqlArguments>
    where
        O: for<'r> FromRow<'r, MySqlRow>,
    {
        let mut query = sqlx::query_as::<MySql, O>(&self.sql);
        for param in &self.params {
            query = match param {
                SqlParam::Text(value) => query.bind(value.as_str()),
                SqlParam::Int(value) => query.bind(*value),
            };
        }
        query
    }
}

/// `SELECT ... FROM user_logs WHERE ... ORDER BY timestamp DESC LIMIT ? OFFSET ?`
pub fn build_log_search(filter: &SearchFilter) -> BuiltQuery {
    let mut query = BuiltQuery::new(format!(
        "SELECT {} FROM {} WHERE 1=1",
        LOG_COLUMNS, LOG_TABLE
    ));

    if let Some(identifier) = &filter.identifier {
        push_match(&mut query, "identifier", identifier);
    }

    if !filter.actions.is_empty() {
        let conditions = filter
            .actions
            .iter()
            .map(|action| format!("action {} ?", action.sql_operator()))
            .collect::<Vec<_>>()
            .join(" OR ");
        query.push(&format!(" AND ({})", conditions));
        for action in &filter.actions {
            query.bind(action.bind_value());
        }
    }

    if let Some(details) = &filter.details {
        push_match(&mut query, "details", details);
    }

    if let Some(server_id) = &filter.server_id {
        query
            .push(" AND JSON_UNQUOTE(JSON_EXTRACT(metadata, '$.playerServerId')) = ?")
            .bind(server_id.as_str());
    }

    if filter.exclude_minigame_deaths {
        query.push(
            " AND ((action NOT IN (?, ?, ?) AND action IS NOT NULL) \
             OR (metadata LIKE ? AND metadata IS NOT NULL))",
        );
        for action in DEATH_ACTIONS {
            query.bind(action);
        }
        query.bind(EMPTY_MINIGAMES_PATTERN);
    }

    if let Some(before) = filter.before {
        query.push(" AND timestamp < FROM_UNIXTIME(?)").bind(before);
    }

    if let Some(after) = filter.after {
        query.push(" AND timestamp > FROM_UNIXTIME(?)").bind(after);
    }

    query
        .push(" ORDER BY timestamp DESC LIMIT ? OFFSET ?")
        .bind(filter.page.limit())
        .bind(filter.page.offset());

    query
}

fn push_match(query: &mut BuiltQuery, column: &str, matcher: &TextMatch) {
    query
        .push(&format!(" AND {} {} ?", column, matcher.sql_operator()))
        .bind(matcher.bind_value());
}

/// Distinct actions ranked exact, then prefix, then the rest, by frequency
pub fn build_action_suggest(search: &SuggestionQuery) -> BuiltQuery {
    let mut query = BuiltQuery::new(format!(
        "SELECT action, COUNT(*) AS count FROM {} WHERE action LIKE ? GROUP BY action \
         ORDER BY CASE WHEN action = ? THEN 1 WHEN action LIKE ? THEN 2 ELSE 3 END, count DESC \
         LIMIT ?",
        LOG_TABLE
    ));
    query
        .bind(search.pattern.bind_value())
        .bind(search.term.as_str())
        .bind(format!("{}%", search.term))
        .bind(SUGGESTION_LIMIT);
    query
}
