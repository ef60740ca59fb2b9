//! Database connector factory
//!
//! Creates the connector implementation selected by `connector.name`.

use crate::adapters::database::traits::DatabaseConnector;
use crate::adapters::postgres::client::PostgresClient;
use crate::adapters::postgres::connector::PostgresConnector;
use crate::config::{ConnectorName, LoaderConfig};
use crate::domain::errors::EtlError;
use crate::domain::result::Result;
use std::sync::Arc;

/// Create a database connector from the configuration
///
/// # Errors
///
/// Returns an error if the selected backend's configuration section is
/// missing or the client cannot be constructed.
pub fn create_connector(config: &LoaderConfig) -> Result<Arc<dyn DatabaseConnector>> {
    match config.connector.name {
        ConnectorName::Postgres => {
            let pg_config = config.postgres.as_ref().ok_or_else(|| {
                EtlError::Configuration(
                    "postgres configuration is required when connector.name = 'postgres'"
                        .to_string(),
                )
            })?;

            tracing::debug!(dsn = %pg_config.dsn_safe(), "Creating PostgreSQL connector");
            let client = PostgresClient::new(pg_config.clone())?;
            Ok(Arc::new(PostgresConnector::new(client)) as Arc<dyn DatabaseConnector>)
        }
    }
}

/// Create the raw PostgreSQL client, for schema administration commands
pub fn create_postgres_client(config: &LoaderConfig) -> Result<PostgresClient> {
    let pg_config = config.postgres.as_ref().ok_or_else(|| {
        EtlError::Configuration("postgres configuration is required".to_string())
    })?;
    PostgresClient::new(pg_config.clone())
}
