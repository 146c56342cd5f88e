//! Action suggestion API handler

use crate::api::query_params;
use crate::domain::{ActionSuggestion, SuggestionQuery};
use crate::error::Result;
use crate::service::ActiveSession;
use crate::state::HasServices;
use axum::{
    extract::{RawQuery, State},
    Json,
};

/// GET /api/actions?search=
pub async fn suggest_actions<S: HasServices>(
    State(state): State<S>,
    session: ActiveSession,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<ActionSuggestion>>> {
    let search = query_params(query.as_deref())
        .remove("search")
        .flatten();
    let search = SuggestionQuery::parse(search.as_deref());

    let suggestions = state
        .log_search_service()
        .suggest_actions(&session.session_id, search.as_ref())
        .await?;

    Ok(Json(suggestions))
}
