//! Junos Collector Library
//!
//! Runs a manifest of show commands over one SSH session, stores each
//! output in a timestamped directory, then archives and uploads it.

pub mod config;
pub mod executor;
pub mod output;
pub mod prompt;
pub mod session;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use utils::errors::CollectorError;
pub type Result<T> = std::result::Result<T, CollectorError>;
