//! PostgreSQL connector
//!
//! Implements [`DatabaseConnector`] on top of the pool client. One pooled
//! connection is checked out by `begin` and carries the run transaction
//! until `commit`/`rollback` releases it; dead-letter and failure-history
//! writes take their own connections so they survive a rollback.

use crate::adapters::database::traits::{DatabaseConnector, LoadHistoryEntry, LoadStatus};
use crate::adapters::postgres::client::PostgresClient;
use crate::domain::errors::EtlError;
use crate::domain::result::Result;
use crate::domain::rows::TableBatch;
use crate::domain::tables::{self, TableSpec, MERGE_ORDER};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::pin_mut;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::{ToSql, Type};

/// PostgreSQL implementation of the connector interface
#[derive(Debug)]
pub struct PostgresConnector {
    client: Arc<PostgresClient>,
    /// Connection holding the run transaction while one is open
    txn_conn: Mutex<Option<deadpool_postgres::Object>>,
}

impl PostgresConnector {
    pub fn new(client: PostgresClient) -> Self {
        Self {
            client: Arc::new(client),
            txn_conn: Mutex::new(None),
        }
    }

    pub fn client(&self) -> &Arc<PostgresClient> {
        &self.client
    }

    async fn read_history(&self, query: &str) -> Result<Option<LoadHistoryEntry>> {
        let conn = self.client.get_connection().await?;
        let row = conn.query_opt(query, &[]).await?;

        row.map(|row| {
            let status_str: String = row.get("status");
            let status = LoadStatus::from_str(&status_str).map_err(EtlError::Database)?;
            Ok(LoadHistoryEntry {
                id: row.get("id"),
                load_timestamp: row.get("load_timestamp"),
                status,
                metrics: row.get("metrics"),
            })
        })
        .transpose()
    }
}

#[async_trait]
impl DatabaseConnector for PostgresConnector {
    async fn begin(&self) -> Result<()> {
        let mut guard = self.txn_conn.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let conn = self.client.get_connection().await?;
        conn.batch_execute("BEGIN").await?;
        *guard = Some(conn);
        tracing::debug!("Run transaction opened");
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut guard = self.txn_conn.lock().await;
        let Some(conn) = guard.take() else {
            return Ok(());
        };

        conn.batch_execute("COMMIT").await?;
        tracing::debug!("Run transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut guard = self.txn_conn.lock().await;
        let Some(conn) = guard.take() else {
            return Ok(());
        };

        conn.batch_execute("ROLLBACK").await?;
        tracing::debug!("Run transaction rolled back");
        Ok(())
    }

    async fn truncate_all_tables(&self) -> Result<()> {
        let conn = self.client.get_connection().await?;
        let tables: Vec<&str> = MERGE_ORDER.iter().map(|t| t.name).collect();
        let sql = format!(
            "TRUNCATE TABLE {} RESTART IDENTITY CASCADE",
            tables.join(", ")
        );
        conn.batch_execute(&sql).await?;
        tracing::info!("All data tables truncated for full load");
        Ok(())
    }

    async fn bulk_load_staging(&self, batch: &TableBatch) -> Result<u64> {
        let mut guard = self.txn_conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| EtlError::Database("bulk load outside a run transaction".to_string()))?;

        let spec = batch.spec();
        let staging = spec.staging_name();

        // Staging is truncated per load; the merge that follows each load is
        // what makes the truncate safe across batches.
        conn.batch_execute(&format!("TRUNCATE TABLE {staging}")).await?;

        let copy_sql = format!(
            "COPY {staging} ({}) FROM STDIN BINARY",
            spec.columns.join(", ")
        );
        let sink = conn.copy_in(copy_sql.as_str()).await?;
        let types = column_types(batch);
        let writer = BinaryCopyInWriter::new(sink, &types);
        pin_mut!(writer);

        match batch {
            TableBatch::RawStudies(rows) => {
                for row in rows {
                    let values: [&(dyn ToSql + Sync); 5] = [
                        &row.nct_id,
                        &row.last_updated_api,
                        &row.last_updated_api_str,
                        &row.ingestion_timestamp,
                        &row.payload,
                    ];
                    writer.as_mut().write(&values).await?;
                }
            }
            TableBatch::Studies(rows) => {
                for row in rows {
                    let values: [&(dyn ToSql + Sync); 10] = [
                        &row.nct_id,
                        &row.brief_title,
                        &row.official_title,
                        &row.overall_status,
                        &row.start_date,
                        &row.start_date_str,
                        &row.primary_completion_date,
                        &row.primary_completion_date_str,
                        &row.study_type,
                        &row.brief_summary,
                    ];
                    writer.as_mut().write(&values).await?;
                }
            }
            TableBatch::Sponsors(rows) => {
                for row in rows {
                    let values: [&(dyn ToSql + Sync); 4] =
                        [&row.nct_id, &row.agency_class, &row.name, &row.is_lead];
                    writer.as_mut().write(&values).await?;
                }
            }
            TableBatch::Conditions(rows) => {
                for row in rows {
                    let values: [&(dyn ToSql + Sync); 2] = [&row.nct_id, &row.name];
                    writer.as_mut().write(&values).await?;
                }
            }
            TableBatch::Interventions(rows) => {
                for row in rows {
                    let values: [&(dyn ToSql + Sync); 4] = [
                        &row.nct_id,
                        &row.intervention_type,
                        &row.name,
                        &row.description,
                    ];
                    writer.as_mut().write(&values).await?;
                }
            }
            TableBatch::InterventionArmGroups(rows) => {
                for row in rows {
                    let values: [&(dyn ToSql + Sync); 3] =
                        [&row.nct_id, &row.intervention_name, &row.arm_group_label];
                    writer.as_mut().write(&values).await?;
                }
            }
            TableBatch::DesignOutcomes(rows) => {
                for row in rows {
                    let values: [&(dyn ToSql + Sync); 5] = [
                        &row.nct_id,
                        &row.outcome_type,
                        &row.measure,
                        &row.time_frame,
                        &row.description,
                    ];
                    writer.as_mut().write(&values).await?;
                }
            }
        }

        let written = writer.finish().await?;
        tracing::debug!(table = spec.name, rows = written, "Staged batch via COPY");
        Ok(written)
    }

    async fn execute_merge(&self, table: &str, key_columns: &[&str]) -> Result<u64> {
        let mut guard = self.txn_conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| EtlError::Database("merge outside a run transaction".to_string()))?;

        let spec = tables::by_name(table)
            .ok_or_else(|| EtlError::Database(format!("unknown table: {table}")))?;

        let sql = build_merge_sql(spec, key_columns);
        let merged = conn.execute(sql.as_str(), &[]).await?;

        tracing::debug!(table, rows = merged, "Merged staging into target");
        Ok(merged)
    }

    async fn record_failed_study(
        &self,
        nct_id: Option<&str>,
        payload: &Value,
        error: &str,
    ) -> Result<()> {
        // Deliberately not on the transaction connection: dead-letter rows
        // must remain visible even if the run is rolled back.
        let conn = self.client.get_connection().await?;
        conn.execute(
            "INSERT INTO dead_letter_queue (nct_id, payload, error_message) \
             VALUES ($1, $2, $3)",
            &[&nct_id, payload, &error],
        )
        .await?;
        Ok(())
    }

    async fn record_load_history(&self, status: LoadStatus, metrics: &Value) -> Result<()> {
        let now = Utc::now();
        let status_str = status.as_str();
        let insert = "INSERT INTO load_history (load_timestamp, status, metrics) \
                      VALUES ($1, $2, $3)";
        let params: [&(dyn ToSql + Sync); 3] = [&now, &status_str, metrics];

        match status {
            LoadStatus::Success => {
                let mut guard = self.txn_conn.lock().await;
                match guard.as_mut() {
                    Some(conn) => {
                        conn.execute(insert, &params).await?;
                    }
                    None => {
                        let conn = self.client.get_connection().await?;
                        conn.execute(insert, &params).await?;
                    }
                }
            }
            LoadStatus::Failure => {
                let conn = self.client.get_connection().await?;
                conn.execute(insert, &params).await?;
            }
        }
        Ok(())
    }

    async fn get_last_successful_load_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.client.get_connection().await?;
        let row = conn
            .query_one(
                "SELECT MAX(load_timestamp) FROM load_history WHERE status = 'SUCCESS'",
                &[],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn get_last_load_history(&self) -> Result<Option<LoadHistoryEntry>> {
        self.read_history(
            "SELECT id, load_timestamp, status, metrics FROM load_history \
             ORDER BY load_timestamp DESC LIMIT 1",
        )
        .await
    }

    async fn get_last_successful_load_history(&self) -> Result<Option<LoadHistoryEntry>> {
        self.read_history(
            "SELECT id, load_timestamp, status, metrics FROM load_history \
             WHERE status = 'SUCCESS' ORDER BY load_timestamp DESC LIMIT 1",
        )
        .await
    }
}

/// Postgres column types for the batch, in staging DDL order
fn column_types(batch: &TableBatch) -> Vec<Type> {
    match batch {
        TableBatch::RawStudies(_) => vec![
            Type::TEXT,
            Type::TIMESTAMPTZ,
            Type::TEXT,
            Type::TIMESTAMPTZ,
            Type::JSONB,
        ],
        TableBatch::Studies(_) => vec![
            Type::TEXT,
            Type::TEXT,
            Type::TEXT,
            Type::TEXT,
            Type::DATE,
            Type::TEXT,
            Type::DATE,
            Type::TEXT,
            Type::TEXT,
            Type::TEXT,
        ],
        TableBatch::Sponsors(_) => vec![Type::TEXT, Type::TEXT, Type::TEXT, Type::BOOL],
        TableBatch::Conditions(_) => vec![Type::TEXT, Type::TEXT],
        TableBatch::Interventions(_) => vec![Type::TEXT, Type::TEXT, Type::TEXT, Type::TEXT],
        TableBatch::InterventionArmGroups(_) => vec![Type::TEXT, Type::TEXT, Type::TEXT],
        TableBatch::DesignOutcomes(_) => {
            vec![Type::TEXT, Type::TEXT, Type::TEXT, Type::TEXT, Type::TEXT]
        }
    }
}

/// Build the staged-rows merge statement for a table
///
/// Insert-or-update keyed on the natural key; tables whose every column is
/// part of the key fall back to DO NOTHING.
fn build_merge_sql(spec: &TableSpec, key_columns: &[&str]) -> String {
    let col_names = spec.columns.join(", ");
    let staging = spec.staging_name();
    let conflict_target = key_columns.join(", ");

    let update_cols: Vec<&str> = spec
        .columns
        .iter()
        .filter(|c| !key_columns.contains(c))
        .copied()
        .collect();

    let on_conflict = if update_cols.is_empty() {
        "DO NOTHING".to_string()
    } else {
        let assignments: Vec<String> = update_cols
            .iter()
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();
        format!("DO UPDATE SET {}", assignments.join(", "))
    };

    format!(
        "INSERT INTO {table} ({col_names}) \
         SELECT {col_names} FROM {staging} \
         ON CONFLICT ({conflict_target}) {on_conflict}",
        table = spec.name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rows::ConditionRow;
    use crate::domain::tables;

    #[test]
    fn test_merge_sql_upserts_non_key_columns() {
        let sql = build_merge_sql(&tables::STUDIES, &["nct_id"]);

        assert!(sql.starts_with("INSERT INTO studies (nct_id, brief_title,"));
        assert!(sql.contains("FROM staging_studies"));
        assert!(sql.contains("ON CONFLICT (nct_id) DO UPDATE SET"));
        assert!(sql.contains("brief_title = EXCLUDED.brief_title"));
        assert!(sql.contains("brief_summary = EXCLUDED.brief_summary"));
        // Key column never appears in the update list
        assert!(!sql.contains("nct_id = EXCLUDED.nct_id"));
    }

    #[test]
    fn test_merge_sql_pure_key_table_does_nothing() {
        let sql = build_merge_sql(&tables::CONDITIONS, &["nct_id", "name"]);
        assert!(sql.contains("ON CONFLICT (nct_id, name) DO NOTHING"));
        assert!(!sql.contains("DO UPDATE"));
    }

    #[test]
    fn test_merge_sql_sponsors() {
        let sql = build_merge_sql(&tables::SPONSORS, &["nct_id", "name", "agency_class"]);
        assert!(sql.contains("ON CONFLICT (nct_id, name, agency_class) DO UPDATE SET is_lead = EXCLUDED.is_lead"));
    }

    #[test]
    fn test_column_types_match_registry_width() {
        let batch = TableBatch::Conditions(vec![ConditionRow {
            nct_id: "NCT00000001".to_string(),
            name: "Asthma".to_string(),
        }]);
        assert_eq!(column_types(&batch).len(), batch.spec().columns.len());

        let batch = TableBatch::Studies(vec![]);
        assert_eq!(column_types(&batch).len(), batch.spec().columns.len());

        let batch = TableBatch::RawStudies(vec![]);
        assert_eq!(column_types(&batch).len(), batch.spec().columns.len());

        let batch = TableBatch::Sponsors(vec![]);
        assert_eq!(column_types(&batch).len(), batch.spec().columns.len());

        let batch = TableBatch::Interventions(vec![]);
        assert_eq!(column_types(&batch).len(), batch.spec().columns.len());

        let batch = TableBatch::InterventionArmGroups(vec![]);
        assert_eq!(column_types(&batch).len(), batch.spec().columns.len());

        let batch = TableBatch::DesignOutcomes(vec![]);
        assert_eq!(column_types(&batch).len(), batch.spec().columns.len());
    }
}
