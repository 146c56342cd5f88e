//! Logboard Core - operator dashboard backend
//!
//! Serves a Discord-authenticated dashboard for searching the `user_logs`
//! audit table: session gate, filtered and paginated log search with query
//! deadlines, and action-name suggestions.

pub mod api;
pub mod config;
pub mod crypto;
pub mod discord;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
