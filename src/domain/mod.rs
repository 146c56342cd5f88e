//! Domain models for Logboard Core

pub mod filter;
pub mod log_entry;
pub mod operator;

pub use filter::*;
pub use log_entry::*;
pub use operator::*;
