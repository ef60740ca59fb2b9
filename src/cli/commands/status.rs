//! `status` command: show load history

use crate::adapters::database::create_connector;
use crate::adapters::database::traits::{LoadHistoryEntry, LoadStatus};
use crate::config::load_config;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Name of the database connector to use
    #[arg(long, default_value = "postgres")]
    pub connector: String,
}

impl StatusArgs {
    /// Execute the status command, returning the process exit code
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        if !self.connector.eq_ignore_ascii_case("postgres") {
            eprintln!("Error: unsupported connector '{}'", self.connector);
            return Ok(2);
        }

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let connector = match create_connector(&config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {e}");
                return Ok(2);
            }
        };

        let last = match connector.get_last_load_history().await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read load history");
                eprintln!("Error: could not retrieve status: {e}");
                return Ok(1);
            }
        };

        let Some(last) = last else {
            println!("No ETL run history found.");
            return Ok(0);
        };

        match last.status {
            LoadStatus::Failure => {
                println!("ETL status: FAILED");
                println!("The most recent ETL run failed.");
                print_history("Failed run details:", &last);

                match connector.get_last_successful_load_history().await? {
                    Some(success) => {
                        println!("{}", "-".repeat(20));
                        print_history("Last successful run:", &success);
                    }
                    None => println!("No prior successful runs were found."),
                }
            }
            LoadStatus::Success => {
                println!("ETL status: HEALTHY");
                println!("The most recent ETL run completed successfully.");
                print_history("Last run details:", &last);
            }
        }

        Ok(0)
    }
}

fn print_history(title: &str, entry: &LoadHistoryEntry) {
    println!("{title}");
    println!("  Timestamp: {}", entry.load_timestamp.to_rfc3339());
    println!("  Status:    {}", entry.status);
    println!("  Metrics:");
    let pretty = serde_json::to_string_pretty(&entry.metrics)
        .unwrap_or_else(|_| entry.metrics.to_string());
    for line in pretty.lines() {
        println!("    {line}");
    }
}
