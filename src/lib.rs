//! # ctgov-loader
//!
//! An ETL engine that ingests clinical-study records from the
//! ClinicalTrials.gov V2 HTTP API and materializes them into a normalized
//! PostgreSQL warehouse.
//!
//! ## Pipeline
//!
//! - **Extract**: paginated fetches from `/api/v2/studies` with retry and
//!   exponential backoff, streamed one study at a time through a bounded
//!   channel ([`adapters::ctgov`]).
//! - **Validate**: structural validation of each raw JSON study into a typed
//!   record; malformed records go to the dead-letter queue and the run
//!   continues ([`core::validate`]).
//! - **Transform**: flattening into seven normalized row buffers
//!   ([`core::transform`]).
//! - **Load + merge**: staging tables filled via the COPY protocol, then
//!   merged into the targets with natural-key UPSERTs, all inside a single
//!   run transaction ([`adapters::postgres`]).
//! - **Orchestrate**: full/delta watermark resolution, batching, metrics and
//!   load history ([`core::etl`]).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use ctgov_loader::adapters::ctgov::CtgovApiClient;
//! use ctgov_loader::adapters::database::create_connector;
//! use ctgov_loader::config::load_config;
//! use ctgov_loader::core::etl::{EtlOrchestrator, LoadType};
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! # async fn example() -> ctgov_loader::domain::Result<()> {
//! let config = load_config("ctgov-loader.toml")?;
//! let connector = create_connector(&config)?;
//! let source = Arc::new(CtgovApiClient::new(config.api.clone())?);
//! let (_tx, shutdown_rx) = watch::channel(false);
//!
//! let orchestrator = EtlOrchestrator::new(connector, source, config, shutdown_rx);
//! let report = orchestrator.run_etl(LoadType::Delta).await?;
//! println!("merged {} rows", report.total_rows_merged());
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
