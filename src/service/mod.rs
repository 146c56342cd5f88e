//! Business logic layer

pub mod deadline;
pub mod log_search;
pub mod session;

pub use deadline::{InFlightSearches, QueryDeadline};
pub use log_search::{LogPage, LogSearchService};
pub use session::{ActiveSession, SessionService};
