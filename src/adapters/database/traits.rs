//! Database abstraction traits
//!
//! The backend boundary of the loader. A connector owns one database
//! connection pool, brackets each run in a single transaction, and exposes
//! the staging/merge/bookkeeping operations the orchestrator drives.

use crate::domain::result::Result;
use crate::domain::rows::TableBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Outcome of a load run, as recorded in load history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Success,
    Failure,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Success => "SUCCESS",
            LoadStatus::Failure => "FAILURE",
        }
    }
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoadStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(LoadStatus::Success),
            "FAILURE" => Ok(LoadStatus::Failure),
            other => Err(format!("unknown load status: {other}")),
        }
    }
}

/// One row of the load history table
#[derive(Debug, Clone)]
pub struct LoadHistoryEntry {
    pub id: i64,
    pub load_timestamp: DateTime<Utc>,
    pub status: LoadStatus,
    pub metrics: Value,
}

/// Database connector interface
///
/// All backend implementations must satisfy these contracts:
///
/// - `begin`/`commit`/`rollback` bracket the entire run in one transaction
///   and are idempotent no-ops when redundant.
/// - `record_failed_study` and a FAILURE `record_load_history` run outside
///   the main transaction so they survive a rollback.
/// - `bulk_load_staging` truncates the staging table first and must use the
///   backend's bulk protocol, not row-by-row inserts.
#[async_trait]
pub trait DatabaseConnector: Send + Sync + std::fmt::Debug {
    /// Open the run transaction. No-op if one is already open.
    async fn begin(&self) -> Result<()>;

    /// Commit the run transaction. No-op without an open transaction.
    async fn commit(&self) -> Result<()>;

    /// Roll back the run transaction. No-op without an open transaction.
    async fn rollback(&self) -> Result<()>;

    /// Truncate every data table, cascading. Full-load preparation.
    async fn truncate_all_tables(&self) -> Result<()>;

    /// Truncate the batch's staging table and stream the rows into it via
    /// the backend bulk protocol. Returns the number of rows written.
    async fn bulk_load_staging(&self, batch: &TableBatch) -> Result<u64>;

    /// Merge the staging table into its target: insert rows whose natural
    /// key is absent, update all non-key columns where it matches. Returns
    /// the number of rows merged.
    async fn execute_merge(&self, table: &str, key_columns: &[&str]) -> Result<u64>;

    /// Insert one dead-letter row. Runs outside the main transaction so the
    /// entry survives a later rollback.
    async fn record_failed_study(
        &self,
        nct_id: Option<&str>,
        payload: &Value,
        error: &str,
    ) -> Result<()>;

    /// Record the outcome of a run. SUCCESS joins the run transaction,
    /// FAILURE commits on its own connection.
    async fn record_load_history(&self, status: LoadStatus, metrics: &Value) -> Result<()>;

    /// The high-water mark: latest `load_timestamp` among SUCCESS entries
    async fn get_last_successful_load_timestamp(&self) -> Result<Option<DateTime<Utc>>>;

    /// Most recent load history entry, if any
    async fn get_last_load_history(&self) -> Result<Option<LoadHistoryEntry>>;

    /// Most recent SUCCESS load history entry, if any
    async fn get_last_successful_load_history(&self) -> Result<Option<LoadHistoryEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_load_status_round_trip() {
        assert_eq!(LoadStatus::Success.as_str(), "SUCCESS");
        assert_eq!(LoadStatus::Failure.as_str(), "FAILURE");
        assert_eq!(LoadStatus::from_str("SUCCESS").unwrap(), LoadStatus::Success);
        assert_eq!(LoadStatus::from_str("FAILURE").unwrap(), LoadStatus::Failure);
        assert!(LoadStatus::from_str("PENDING").is_err());
    }

    #[test]
    fn test_load_status_display() {
        assert_eq!(LoadStatus::Success.to_string(), "SUCCESS");
    }
}
