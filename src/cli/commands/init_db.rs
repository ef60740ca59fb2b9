//! `init-db` command: wipe and re-create the warehouse schema

use crate::adapters::database::create_postgres_client;
use crate::config::load_config;
use clap::Args;
use std::io::{self, Write};

/// Arguments for the init-db command
#[derive(Args, Debug)]
pub struct InitDbArgs {
    /// Bypass the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl InitDbArgs {
    /// Execute the init-db command, returning the process exit code
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        if !self.yes {
            print!(
                "This will drop ALL tables and re-initialize the database. \
                 This action is irreversible. Continue? [y/N]: "
            );
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Database initialization aborted.");
                return Ok(0);
            }
        }

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

        tracing::info!("Initializing database from scratch");

        if let Err(e) = client.drop_all_tables().await {
            tracing::error!(error = %e, "Failed to drop tables");
            eprintln!("Error: could not drop tables: {e}");
            return Ok(1);
        }

        match client.apply_schema().await {
            Ok(()) => {
                println!("Database initialized.");
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to apply schema");
                eprintln!("Error: could not apply schema: {e}");
                Ok(1)
            }
        }
    }
}
