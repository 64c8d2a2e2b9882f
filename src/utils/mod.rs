//! Utility modules
//!
//! Provides logging setup.

pub mod logging;

pub use logging::{init_logging, init_logging_in};
