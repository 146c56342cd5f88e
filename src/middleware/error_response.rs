//! Error response normalization
//!
//! Every 4xx/5xx leaves the server as `{"error": "..."}`. Framework-level
//! rejections (text/plain) are replaced with a generic message, and outside
//! production application errors gain a `details` field with the full error
//! text.

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;

use crate::error::{ErrorDetail, ErrorResponse};

const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Whether error details may be shown to clients
#[derive(Debug, Clone, Copy)]
pub struct ErrorExposure {
    pub expose_details: bool,
}

pub async fn normalize_error_response(
    State(exposure): State<ErrorExposure>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    let status = response.status();

    // Probe and scrape endpoints answer for themselves
    if matches!(path.as_str(), "/health" | "/ready" | "/metrics") {
        return response;
    }

    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));

    if !is_json {
        return generic_error_response(status);
    }

    match response.extensions().get::<ErrorDetail>().cloned() {
        Some(detail) if exposure.expose_details => attach_details(response, detail).await,
        _ => response,
    }
}

async fn attach_details(response: Response, detail: ErrorDetail) -> Response {
    let status = response.status();
    let (mut parts, body) = response.into_parts();

    let Ok(bytes) = to_bytes(body, MAX_ERROR_BODY_BYTES).await else {
        return generic_error_response(status);
    };
    let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return generic_error_response(status);
    };

    if let Some(object) = value.as_object_mut() {
        object.insert("details".to_string(), serde_json::Value::String(detail.0));
    }

    let Ok(body) = serde_json::to_vec(&value) else {
        return generic_error_response(status);
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(body))
}

fn generic_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "Bad request",
        StatusCode::UNAUTHORIZED => "Unauthorized",
        StatusCode::FORBIDDEN => "Forbidden",
        StatusCode::NOT_FOUND => "Not found",
        StatusCode::METHOD_NOT_ALLOWED => "Method not allowed",
        StatusCode::CONFLICT => "Request superseded",
        StatusCode::GATEWAY_TIMEOUT => "Query timeout - try refining your search filters",
        _ if status.is_client_error() => "Client error",
        _ => "Internal server error",
    }
}

fn generic_error_response(status: StatusCode) -> Response {
    (status, Json(ErrorResponse::new(generic_message(status)))).into_response()
}

/// Terminal handler for panics caught by `CatchPanicLayer`
pub fn panic_response(err: Box<dyn Any + Send + 'static>, expose_details: bool) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    tracing::error!(panic = %message, "Request handler panicked");

    let mut body = ErrorResponse::new("Internal server error");
    if expose_details {
        body.details = Some(message);
    }
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
