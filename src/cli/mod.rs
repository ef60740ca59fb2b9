//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// ClinicalTrials.gov warehouse loader
#[derive(Parser, Debug)]
#[command(name = "ctgov-loader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ctgov-loader.toml", env = "CTGOV_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CTGOV_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ETL process
    Run(commands::run::RunArgs),

    /// Apply database migrations
    MigrateDb(commands::migrate::MigrateArgs),

    /// DESTRUCTIVE: drop all tables and re-create the schema from scratch
    InitDb(commands::init_db::InitDbArgs),

    /// Show the status and history of the ETL process
    Status(commands::status::StatusArgs),
}
