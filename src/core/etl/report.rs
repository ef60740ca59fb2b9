//! Run reporting
//!
//! Counters collected over one ETL run and their serialization into the
//! `load_history.metrics` blob.

use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Kind of load to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
    /// Everything the API returns, after truncating the data tables
    Full,
    /// Only studies updated since the last successful run
    Delta,
}

impl std::fmt::Display for LoadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadType::Full => f.write_str("full"),
            LoadType::Delta => f.write_str("delta"),
        }
    }
}

impl std::str::FromStr for LoadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(LoadType::Full),
            "delta" => Ok(LoadType::Delta),
            other => Err(format!("invalid load type '{other}', expected 'full' or 'delta'")),
        }
    }
}

/// Counters for one ETL run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub load_type: LoadType,
    pub studies_fetched: u64,
    pub studies_valid: u64,
    pub studies_invalid: u64,
    /// Rows merged per target table
    pub rows_merged: BTreeMap<String, u64>,
    pub retry_count: u64,
    pub wall_clock_ms: u64,
}

impl RunReport {
    pub fn new(load_type: LoadType) -> Self {
        Self {
            load_type,
            studies_fetched: 0,
            studies_valid: 0,
            studies_invalid: 0,
            rows_merged: BTreeMap::new(),
            retry_count: 0,
            wall_clock_ms: 0,
        }
    }

    /// Accumulate rows merged into a table
    pub fn record_merge(&mut self, table: &str, rows: u64) {
        *self.rows_merged.entry(table.to_string()).or_insert(0) += rows;
    }

    /// Total rows merged across all tables
    pub fn total_rows_merged(&self) -> u64 {
        self.rows_merged.values().sum()
    }

    /// Serialize into the load-history metrics blob
    pub fn to_metrics(&self) -> Value {
        let seconds = self.wall_clock_ms as f64 / 1000.0;
        let throughput = if seconds > 0.0 {
            (self.studies_fetched as f64 / seconds * 100.0).round() / 100.0
        } else {
            0.0
        };

        json!({
            "load_type": self.load_type.to_string(),
            "studies_fetched": self.studies_fetched,
            "studies_valid": self.studies_valid,
            "studies_invalid": self.studies_invalid,
            "rows_merged": self.rows_merged,
            "retry_count": self.retry_count,
            "wall_clock_ms": self.wall_clock_ms,
            "throughput_studies_per_sec": throughput,
        })
    }

    /// Log a one-line summary of the run
    pub fn log_summary(&self) {
        tracing::info!(
            load_type = %self.load_type,
            studies_fetched = self.studies_fetched,
            studies_valid = self.studies_valid,
            studies_invalid = self.studies_invalid,
            rows_merged = self.total_rows_merged(),
            retry_count = self.retry_count,
            wall_clock_ms = self.wall_clock_ms,
            "ETL run completed"
        );
    }
}
