//! Discord login, callback and logout handlers

use crate::api::query_params;
use crate::error::{AppError, Result};
use crate::middleware::require_auth::authorize;
use crate::middleware::cookie_value;
use crate::service::session::OAUTH_STATE_COOKIE;
use crate::state::HasServices;
use axum::{
    extract::{RawQuery, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
};
use metrics::counter;

/// Where every failed login attempt ends up
pub const LOGIN_FAILED_REDIRECT: &str = "/login?error=auth_failed";

const LOGIN_PAGE: &str = include_str!("../../assets/login.html");
const ERROR_BANNER_SLOT: &str = "<!--ERROR_BANNER-->";
const AUTH_FAILED_BANNER: &str =
    r#"<div class="error">Sign-in failed or this account is not authorized.</div>"#;

fn with_cookies(mut response: Response, cookies: &[String]) -> Response {
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

/// GET /login
pub async fn login_page<S: HasServices>(
    State(state): State<S>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let cookie = cookie_value(&headers, state.session_service().cookie_name());
    if authorize(&state, cookie.as_deref()).await.is_ok() {
        return Redirect::to("/").into_response();
    }

    let failed = query_params(query.as_deref())
        .get("error")
        .is_some_and(|error| error.as_deref() == Some("auth_failed"));
    let banner = if failed { AUTH_FAILED_BANNER } else { "" };

    Html(LOGIN_PAGE.replace(ERROR_BANNER_SLOT, banner)).into_response()
}

/// GET /auth/discord
pub async fn discord_login<S: HasServices>(State(state): State<S>) -> Response {
    let (oauth_state, cookie) = state.session_service().issue_oauth_state();

    match state.discord_client().authorization_url(&oauth_state) {
        Ok(url) => with_cookies(Redirect::to(&url).into_response(), &[cookie]),
        Err(e) => {
            tracing::error!("Cannot build Discord authorization URL: {}", e);
            Redirect::to(LOGIN_FAILED_REDIRECT).into_response()
        }
    }
}

/// GET /auth/discord/callback
pub async fn discord_callback<S: HasServices>(
    State(state): State<S>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let sessions = state.session_service();
    let clear_state = sessions.clear_oauth_state_cookie();

    match complete_login(&state, &headers, query.as_deref()).await {
        Ok(session_cookie) => {
            counter!("logboard_auth_login_total", "result" => "success").increment(1);
            with_cookies(
                Redirect::to("/").into_response(),
                &[sessions.session_cookie(&session_cookie), clear_state],
            )
        }
        Err(e) => {
            let result = match &e {
                AppError::Unauthorized(_) => "denied",
                _ => "error",
            };
            counter!("logboard_auth_login_total", "result" => result).increment(1);
            tracing::warn!("Discord login failed: {}", e);
            with_cookies(
                Redirect::to(LOGIN_FAILED_REDIRECT).into_response(),
                &[clear_state],
            )
        }
    }
}

/// Validate the callback and open a session; returns the signed cookie value
async fn complete_login<S: HasServices>(
    state: &S,
    headers: &HeaderMap,
    query: Option<&str>,
) -> Result<String> {
    let mut params = query_params(query);

    if let Some(error) = params.remove("error").flatten() {
        return Err(AppError::OAuth(format!("Discord returned error: {}", error)));
    }

    let returned_state = params.remove("state").flatten().unwrap_or_default();
    let state_cookie = cookie_value(headers, OAUTH_STATE_COOKIE);
    if !state
        .session_service()
        .verify_oauth_state(state_cookie.as_deref(), &returned_state)
    {
        return Err(AppError::BadRequest("OAuth state mismatch".to_string()));
    }

    let code = params
        .remove("code")
        .flatten()
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let discord = state.discord_client();
    let token = discord.exchange_code(&code).await?;
    let operator = discord.get_user(&token.access_token).await?;

    if !state.config().allowed_users.contains(&operator.id) {
        return Err(AppError::Unauthorized(format!(
            "Discord user {} is not on the allow-list",
            operator.id
        )));
    }

    tracing::info!(operator_id = %operator.id, username = %operator.username, "Operator signed in");

    let previous = cookie_value(headers, state.session_service().cookie_name());
    state
        .session_service()
        .create_session(operator, previous.as_deref())
        .await
}

/// GET /logout
pub async fn logout<S: HasServices>(State(state): State<S>, headers: HeaderMap) -> Response {
    let sessions = state.session_service();

    if let Some(cookie) = cookie_value(&headers, sessions.cookie_name()) {
        if let Err(e) = sessions.destroy_by_cookie(&cookie).await {
            tracing::error!("Session destruction error: {}", e);
        }
    }

    with_cookies(
        Redirect::to("/login").into_response(),
        &[sessions.clear_session_cookie()],
    )
}
