//! HTTP middleware for Logboard Core
//!
//! - Session gate and the `ActiveSession` extractor
//! - Security headers
//! - Error response normalization and panic handling
//! - Request tracing and metrics

pub mod error_response;
pub mod metrics;
pub mod require_auth;
pub mod security_headers;
pub mod trace;

pub use error_response::{normalize_error_response, panic_response, ErrorExposure};
pub use metrics::ObservabilityLayer;
pub use require_auth::{cookie_value, require_session};
pub use security_headers::security_headers_middleware;
pub use trace::SanitizedMakeSpan;
