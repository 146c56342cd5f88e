//! Session gate for the dashboard and its API
//!
//! A request passes when it carries a signed session cookie whose session is
//! live and whose operator is on the allow-list. Anything else destroys the
//! session, clears the cookie, and gets a 401 (API and XHR) or a redirect to
//! `/login` (pages).

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue, Request,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::AppError;
use crate::service::ActiveSession;
use crate::state::HasServices;

/// Value of the cookie called `name`, if sent
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}

/// API paths and XHR requests get JSON instead of a redirect
pub fn wants_json(path: &str, headers: &HeaderMap) -> bool {
    path.starts_with("/api/")
        || headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Resolve the operator behind a request's session cookie.
///
/// `Err` carries the reason the request was turned away.
pub async fn authorize<S: HasServices>(
    state: &S,
    cookie: Option<&str>,
) -> std::result::Result<ActiveSession, &'static str> {
    let cookie = cookie.ok_or("no session cookie")?;

    let session = state
        .session_service()
        .resolve(cookie)
        .await
        .map_err(|e| {
            tracing::error!("Session lookup failed: {}", e);
            "session lookup failed"
        })?
        .ok_or("unknown or expired session")?;

    if !state.config().allowed_users.contains(&session.operator.id) {
        tracing::warn!(
            operator_id = %session.operator.id,
            "Session operator is not on the allow-list"
        );
        return Err("operator not allowed");
    }

    Ok(session)
}

/// Gate middleware; attaches [`ActiveSession`] to the request on success
pub async fn require_session<S: HasServices>(
    State(state): State<S>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let sessions = state.session_service();
    let cookie = cookie_value(request.headers(), sessions.cookie_name());

    match authorize(&state, cookie.as_deref()).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(reason) => {
            let path = request.uri().path();
            tracing::debug!(path = %path, reason, "Rejected request at session gate");

            let mut response = if wants_json(path, request.headers()) {
                AppError::Unauthorized(reason.to_string()).into_response()
            } else {
                Redirect::to("/login").into_response()
            };

            if let Some(cookie) = cookie {
                if let Err(e) = sessions.destroy_by_cookie(&cookie).await {
                    tracing::error!("Session destruction error: {}", e);
                }
                if let Ok(value) = HeaderValue::from_str(&sessions.clear_session_cookie()) {
                    response.headers_mut().append(SET_COOKIE, value);
                }
            }

            response
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ActiveSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActiveSession>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("No session on request".to_string()))
    }
}
