//! Log search API handler

use crate::api::query_params;
use crate::domain::{LogSearchParams, SearchFilter};
use crate::error::Result;
use crate::service::{ActiveSession, LogPage};
use crate::state::HasServices;
use axum::{
    extract::{RawQuery, State},
    Json,
};

impl LogSearchParams {
    /// Collect the search fields from a raw query string
    pub fn from_query(raw: Option<&str>) -> Self {
        let mut params = query_params(raw);
        let mut take = |name: &str| params.remove(name).flatten();

        Self {
            identifier: take("identifier"),
            action: take("action"),
            details: take("details"),
            server: take("server"),
            minigames: take("minigames"),
            before: take("before"),
            after: take("after"),
            page: take("page"),
        }
    }
}

/// GET /api/logs
pub async fn search_logs<S: HasServices>(
    State(state): State<S>,
    session: ActiveSession,
    RawQuery(query): RawQuery,
) -> Result<Json<LogPage>> {
    let filter = SearchFilter::from_params(&LogSearchParams::from_query(query.as_deref()));

    let page = state
        .log_search_service()
        .search(&session.session_id, &filter)
        .await?;

    Ok(Json(page))
}
