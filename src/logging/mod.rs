//! Logging and observability
//!
//! Structured logging via the `tracing` stack: console output always,
//! JSON-formatted rolling log files when enabled in configuration.
//!
//! ```no_run
//! use ctgov_loader::logging::init_logging;
//! use ctgov_loader::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//! tracing::info!("loader started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};
