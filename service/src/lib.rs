//! Infrastructure shared by every crate in the console: configuration and logging.

pub mod config;
pub mod logging;
