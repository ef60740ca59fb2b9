//! Configuration management
//!
//! TOML-based configuration with `${VAR}` substitution, `CTGOV_*`
//! environment overrides and validation. The file is optional; every
//! setting has a default except the database DSN.
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [api]
//! base_url = "https://clinicaltrials.gov/api/v2"
//! page_size = 100
//! timeout_seconds = 30
//! max_retries = 5
//!
//! [load]
//! batch_size_rows = 5000
//!
//! [connector]
//! name = "postgres"
//!
//! [postgres]
//! dsn = "${CTGOV_POSTGRES_DSN}"
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApiConfig, ApplicationConfig, ConnectorName, LoadConfig, LoaderConfig, LoggingConfig,
    PostgresConfig, RetryConfig,
};
