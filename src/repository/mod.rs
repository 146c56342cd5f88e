//! Data access layer (Repository pattern)

pub mod log;
pub mod log_query;
pub mod session;

pub use log::LogRepository;
pub use session::{SessionData, SessionRepository};
