//! Configuration loader
//!
//! Loads the TOML configuration file, substitutes `${VAR}` environment
//! variable placeholders, applies `CTGOV_*` environment overrides and
//! validates the result.
//!
//! The file is optional: a missing file falls back to built-in defaults plus
//! environment overrides, so a containerized deployment can run on
//! environment variables alone:
//!
//! ```bash
//! CTGOV_POSTGRES_DSN="postgresql://etl:secret@db:5432/ctgov"
//! CTGOV_API_PAGE_SIZE=500
//! CTGOV_LOAD_BATCH_SIZE_ROWS=10000
//! ```

use super::schema::{ConnectorName, LoaderConfig, PostgresConfig};
use crate::domain::errors::EtlError;
use crate::domain::result::Result;
use regex::Regex;
use secrecy::SecretString;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file, falling back to defaults + env
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, if a
/// `${VAR}` placeholder references an unset variable, or if the resulting
/// configuration fails validation.
pub fn load_config(path: impl AsRef<Path>) -> Result<LoaderConfig> {
    let path = path.as_ref();

    let mut config = if path.exists() {
        let contents = fs::read_to_string(path).map_err(|e| {
            EtlError::Configuration(format!(
                "Failed to read configuration file {}: {e}",
                path.display()
            ))
        })?;

        let contents = substitute_env_vars(&contents)?;

        toml::from_str(&contents)
            .map_err(|e| EtlError::Configuration(format!("Failed to parse TOML: {e}")))?
    } else {
        tracing::debug!(
            path = %path.display(),
            "Configuration file not found, using defaults and environment overrides"
        );
        LoaderConfig::default()
    };

    apply_env_overrides(&mut config);

    config
        .validate()
        .map_err(|e| EtlError::Configuration(format!("Configuration validation failed: {e}")))?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched. Referencing an unset variable is an
/// error so a missing secret fails loudly instead of becoming a literal.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(EtlError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the CTGOV_ prefix
///
/// Supported variables:
/// - CTGOV_APPLICATION_LOG_LEVEL
/// - CTGOV_API_BASE_URL
/// - CTGOV_API_PAGE_SIZE
/// - CTGOV_API_TIMEOUT_SECONDS
/// - CTGOV_API_MAX_RETRIES
/// - CTGOV_API_RETRY_INITIAL_DELAY_MS
/// - CTGOV_API_RETRY_MAX_DELAY_MS
/// - CTGOV_API_RETRY_BACKOFF_MULTIPLIER
/// - CTGOV_LOAD_BATCH_SIZE_ROWS
/// - CTGOV_CONNECTOR_NAME
/// - CTGOV_POSTGRES_DSN
/// - CTGOV_POSTGRES_MAX_CONNECTIONS
/// - CTGOV_POSTGRES_CONNECTION_TIMEOUT_SECONDS
/// - CTGOV_POSTGRES_STATEMENT_TIMEOUT_SECONDS
/// - CTGOV_LOGGING_LOCAL_ENABLED
/// - CTGOV_LOGGING_LOCAL_PATH
/// - CTGOV_LOGGING_LOCAL_ROTATION
fn apply_env_overrides(config: &mut LoaderConfig) {
    if let Ok(val) = std::env::var("CTGOV_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Ok(val) = std::env::var("CTGOV_API_BASE_URL") {
        config.api.base_url = val;
    }
    if let Ok(val) = std::env::var("CTGOV_API_PAGE_SIZE") {
        if let Ok(size) = val.parse() {
            config.api.page_size = size;
        }
    }
    if let Ok(val) = std::env::var("CTGOV_API_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.api.timeout_seconds = timeout;
        }
    }
    if let Ok(val) = std::env::var("CTGOV_API_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.api.max_retries = retries;
        }
    }
    if let Ok(val) = std::env::var("CTGOV_API_RETRY_INITIAL_DELAY_MS") {
        if let Ok(delay) = val.parse() {
            config.api.retry.initial_delay_ms = delay;
        }
    }
    if let Ok(val) = std::env::var("CTGOV_API_RETRY_MAX_DELAY_MS") {
        if let Ok(delay) = val.parse() {
            config.api.retry.max_delay_ms = delay;
        }
    }
    if let Ok(val) = std::env::var("CTGOV_API_RETRY_BACKOFF_MULTIPLIER") {
        if let Ok(multiplier) = val.parse() {
            config.api.retry.backoff_multiplier = multiplier;
        }
    }

    if let Ok(val) = std::env::var("CTGOV_LOAD_BATCH_SIZE_ROWS") {
        if let Ok(size) = val.parse() {
            config.load.batch_size_rows = size;
        }
    }

    if let Ok(val) = std::env::var("CTGOV_CONNECTOR_NAME") {
        if val.eq_ignore_ascii_case("postgres") {
            config.connector.name = ConnectorName::Postgres;
        }
    }

    if let Ok(val) = std::env::var("CTGOV_POSTGRES_DSN") {
        match config.postgres.as_mut() {
            Some(pg) => pg.dsn = SecretString::new(val),
            None => {
                config.postgres = Some(PostgresConfig {
                    dsn: SecretString::new(val),
                    max_connections: 4,
                    connection_timeout_seconds: 30,
                    statement_timeout_seconds: 60,
                });
            }
        }
    }
    if let Some(pg) = config.postgres.as_mut() {
        if let Ok(val) = std::env::var("CTGOV_POSTGRES_MAX_CONNECTIONS") {
            if let Ok(max_conn) = val.parse() {
                pg.max_connections = max_conn;
            }
        }
        if let Ok(val) = std::env::var("CTGOV_POSTGRES_CONNECTION_TIMEOUT_SECONDS") {
            if let Ok(timeout) = val.parse() {
                pg.connection_timeout_seconds = timeout;
            }
        }
        if let Ok(val) = std::env::var("CTGOV_POSTGRES_STATEMENT_TIMEOUT_SECONDS") {
            if let Ok(timeout) = val.parse() {
                pg.statement_timeout_seconds = timeout;
            }
        }
    }

    if let Ok(val) = std::env::var("CTGOV_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("CTGOV_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("CTGOV_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }
}
