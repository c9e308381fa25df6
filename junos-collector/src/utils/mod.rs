//! Utility modules for the collector.

pub mod errors;
pub mod logger;

pub use errors::{CollectorError, Result};
