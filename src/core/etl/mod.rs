//! ETL run orchestration
//!
//! The orchestrator drives the extract → validate → transform → load → merge
//! pipeline inside one database transaction and records the outcome in load
//! history.

pub mod orchestrator;
pub mod report;

pub use orchestrator::EtlOrchestrator;
pub use report::{LoadType, RunReport};
