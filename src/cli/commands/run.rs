//! `run` command: execute one ETL load

use crate::adapters::ctgov::CtgovApiClient;
use crate::adapters::database::create_connector;
use crate::config::load_config;
use crate::core::etl::{EtlOrchestrator, LoadType};
use clap::Args;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Type of load: 'full' or 'delta'
    #[arg(long, default_value = "delta")]
    pub load_type: String,

    /// Name of the database connector to use
    #[arg(long, default_value = "postgres")]
    pub connector: String,
}

impl RunArgs {
    /// Execute the run command, returning the process exit code
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let load_type = match LoadType::from_str(&self.load_type) {
            Ok(lt) => lt,
            Err(e) => {
                eprintln!("Error: {e}");
                return Ok(2);
            }
        };

        if !self.connector.eq_ignore_ascii_case("postgres") {
            eprintln!("Error: unsupported connector '{}'", self.connector);
            return Ok(2);
        }

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let connector = match create_connector(&config) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create database connector");
                eprintln!("Error: {e}");
                return Ok(2);
            }
        };

        let source = match CtgovApiClient::new(config.api.clone()) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create API client");
                eprintln!("Error: {e}");
                return Ok(2);
            }
        };

        let orchestrator = EtlOrchestrator::new(connector, source, config, shutdown_signal);

        match orchestrator.run_etl(load_type).await {
            Ok(report) => {
                println!("ETL run completed successfully");
                println!("  Load type:       {}", report.load_type);
                println!("  Studies fetched: {}", report.studies_fetched);
                println!("  Studies valid:   {}", report.studies_valid);
                println!("  Studies invalid: {}", report.studies_invalid);
                println!("  Rows merged:     {}", report.total_rows_merged());
                println!("  Retries:         {}", report.retry_count);
                println!("  Duration:        {:.2}s", report.wall_clock_ms as f64 / 1000.0);
                Ok(0)
            }
            Err(e) => {
                eprintln!("ETL run failed: {e}");
                if e.is_transient() {
                    eprintln!("The error looks transient; re-running may succeed.");
                    Ok(1)
                } else {
                    Ok(2)
                }
            }
        }
    }
}
