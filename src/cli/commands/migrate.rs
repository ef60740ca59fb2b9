//! `migrate-db` command: apply the warehouse schema

use crate::adapters::database::create_postgres_client;
use crate::config::load_config;
use clap::Args;

/// Arguments for the migrate-db command
#[derive(Args, Debug)]
pub struct MigrateArgs {}

impl MigrateArgs {
    /// Execute the migrate-db command, returning the process exit code
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let client = match create_postgres_client(&config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {e}");
                return Ok(2);
            }
        };

        tracing::info!("Applying database migrations");
        match client.apply_schema().await {
            Ok(()) => {
                println!("Database migrations applied.");
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Migration failed");
                eprintln!("Migration failed: {e}");
                Ok(1)
            }
        }
    }
}
