//! PostgreSQL pool client
//!
//! Owns the deadpool connection pool and the schema administration used by
//! the `migrate-db` / `init-db` commands. The run-level transaction logic
//! lives in the connector, not here.

use crate::config::PostgresConfig;
use crate::domain::errors::EtlError;
use crate::domain::result::Result;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::NoTls;

/// Embedded warehouse DDL, applied by `migrate-db`
pub const INITIAL_SCHEMA: &str = include_str!("../../../migrations/001_initial_schema.sql");

/// PostgreSQL client wrapping a connection pool
#[derive(Debug)]
pub struct PostgresClient {
    pool: Pool,
    config: PostgresConfig,
}

impl PostgresClient {
    /// Create a new client and its pool
    ///
    /// # Errors
    ///
    /// Returns an error if the DSN does not parse or the pool cannot be built.
    pub fn new(config: PostgresConfig) -> Result<Self> {
        let mut pg_config: tokio_postgres::Config =
            config.dsn.expose_secret().parse().map_err(|e| {
                EtlError::Configuration(format!("Invalid PostgreSQL DSN: {e}"))
            })?;

        // Statement timeout is applied at session start for every pooled
        // connection.
        pg_config.options(&format!(
            "-c statement_timeout={}",
            config.statement_timeout_seconds * 1000
        ));

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(Some(Duration::from_secs(config.connection_timeout_seconds)))
            .create_timeout(Some(Duration::from_secs(config.connection_timeout_seconds)))
            .build()
            .map_err(|e| EtlError::Database(format!("Failed to create connection pool: {e}")))?;

        Ok(Self { pool, config })
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| EtlError::Database(format!("Failed to get connection from pool: {e}")))
    }

    /// Verify the database is reachable
    pub async fn test_connection(&self) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.query_one("SELECT 1", &[]).await?;
        tracing::debug!(dsn = %self.config.dsn_safe(), "PostgreSQL connection test successful");
        Ok(())
    }

    /// Apply the embedded warehouse schema
    ///
    /// The DDL is idempotent (`CREATE TABLE IF NOT EXISTS`), so re-running
    /// the migration against an existing warehouse is safe.
    pub async fn apply_schema(&self) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.batch_execute(INITIAL_SCHEMA).await?;
        tracing::info!("Warehouse schema applied");
        Ok(())
    }

    /// Drop every table in the public schema, cascading.
    ///
    /// Destructive: used only by the `init-db` command before re-applying
    /// the schema from scratch.
    pub async fn drop_all_tables(&self) -> Result<()> {
        let conn = self.get_connection().await?;

        let rows = conn
            .query(
                "SELECT tablename FROM pg_catalog.pg_tables WHERE schemaname = 'public'",
                &[],
            )
            .await?;

        let tables: Vec<String> = rows.iter().map(|row| row.get::<_, String>(0)).collect();
        if tables.is_empty() {
            return Ok(());
        }

        let quoted: Vec<String> = tables.iter().map(|t| quote_ident(t)).collect();
        let drop_sql = format!("DROP TABLE IF EXISTS {} CASCADE", quoted.join(", "));
        conn.batch_execute(&drop_sql).await?;

        tracing::warn!(count = tables.len(), "Dropped all tables in public schema");
        Ok(())
    }

    /// The DSN with credentials redacted
    pub fn dsn_safe(&self) -> String {
        self.config.dsn_safe()
    }
}

/// Quote a SQL identifier
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
