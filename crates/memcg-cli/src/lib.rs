//! memcg CLI
//!
//! Configuration, logging and size handling for the `memcg` binary.

pub mod config;
pub mod logging;
pub mod units;

pub use config::Config;
pub use logging::init_logging;
