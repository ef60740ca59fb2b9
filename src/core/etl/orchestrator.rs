//! ETL orchestrator
//!
//! Drives one load run end to end: watermark resolution, extraction,
//! per-record validation with dead-letter routing, batched staging loads and
//! merges, and the transaction + load-history lifecycle.

use crate::adapters::ctgov::StudySource;
use crate::adapters::database::traits::{DatabaseConnector, LoadStatus};
use crate::config::LoaderConfig;
use crate::core::etl::report::{LoadType, RunReport};
use crate::core::transform::Transformer;
use crate::core::validate;
use crate::domain::result::Result;
use crate::domain::EtlError;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Orchestrates one ETL run
pub struct EtlOrchestrator {
    connector: Arc<dyn DatabaseConnector>,
    source: Arc<dyn StudySource>,
    config: LoaderConfig,
    shutdown: watch::Receiver<bool>,
}

impl EtlOrchestrator {
    pub fn new(
        connector: Arc<dyn DatabaseConnector>,
        source: Arc<dyn StudySource>,
        config: LoaderConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            connector,
            source,
            config,
            shutdown,
        }
    }

    /// Execute one load run
    ///
    /// On success the run transaction is committed with a SUCCESS history
    /// entry inside it. On any failure the transaction is rolled back, a
    /// FAILURE history entry is written outside it, and the error is
    /// re-surfaced to the caller.
    pub async fn run_etl(&self, load_type: LoadType) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new(load_type);

        tracing::info!(
            load_type = %load_type,
            batch_size_rows = self.config.load.batch_size_rows,
            "ETL run started"
        );

        match self.execute(load_type, started, &mut report).await {
            Ok(()) => Ok(report),
            Err(e) => {
                tracing::error!(error = %e, "ETL run failed, rolling back");

                if let Err(rollback_err) = self.connector.rollback().await {
                    tracing::error!(error = %rollback_err, "Rollback failed");
                }

                report.retry_count = self.source.retry_count();
                report.wall_clock_ms = started.elapsed().as_millis() as u64;

                let mut metrics = report.to_metrics();
                metrics["error"] = json!(e.to_string());
                metrics["error_kind"] =
                    json!(if e.is_transient() { "transient" } else { "fatal" });

                if let Err(history_err) = self
                    .connector
                    .record_load_history(LoadStatus::Failure, &metrics)
                    .await
                {
                    tracing::error!(error = %history_err, "Failed to record FAILURE load history");
                }

                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        load_type: LoadType,
        started: Instant,
        report: &mut RunReport,
    ) -> Result<()> {
        let updated_since = match load_type {
            LoadType::Full => {
                tracing::info!("Full load: truncating data tables");
                self.connector.truncate_all_tables().await?;
                None
            }
            LoadType::Delta => {
                let watermark = self.connector.get_last_successful_load_timestamp().await?;
                match watermark {
                    Some(ts) => {
                        tracing::info!(updated_since = %ts.to_rfc3339(), "Delta load from high-water mark");
                    }
                    None => {
                        tracing::info!("No successful load found, performing full extraction");
                    }
                }
                watermark
            }
        };

        self.connector.begin().await?;

        let mut studies = self.source.stream_studies(updated_since).await;
        let mut transformer = Transformer::new();

        while let Some(item) = studies.recv().await {
            // Cooperative cancellation point between records
            if *self.shutdown.borrow() {
                return Err(EtlError::Cancelled);
            }

            let raw = item?;
            report.studies_fetched += 1;

            let nct_id = validate::extract_nct_id(&raw);
            match validate::validate_study(&raw) {
                Ok(study) => {
                    transformer.transform_study(&study, &raw);
                    report.studies_valid += 1;
                }
                Err(failure) => {
                    tracing::warn!(
                        nct_id = nct_id.as_deref().unwrap_or("<unknown>"),
                        error = %failure.message,
                        "Study failed validation, routing to dead-letter queue"
                    );
                    self.connector
                        .record_failed_study(nct_id.as_deref(), &raw, &failure.to_string())
                        .await?;
                    report.studies_invalid += 1;
                    continue;
                }
            }

            if transformer.max_buffer_len() >= self.config.load.batch_size_rows {
                self.flush(&mut transformer, report).await?;
            }
        }

        // Remaining partial batch
        self.flush(&mut transformer, report).await?;

        report.retry_count = self.source.retry_count();
        report.wall_clock_ms = started.elapsed().as_millis() as u64;

        self.connector
            .record_load_history(LoadStatus::Success, &report.to_metrics())
            .await?;
        self.connector.commit().await?;

        report.log_summary();
        Ok(())
    }

    /// Stage and merge every non-empty buffer, in dependency order.
    ///
    /// Each table is merged immediately after its staging load so the next
    /// batch can truncate and reuse the staging tables.
    async fn flush(&self, transformer: &mut Transformer, report: &mut RunReport) -> Result<()> {
        if transformer.is_empty() {
            return Ok(());
        }

        let buffered = transformer.studies_buffered();
        tracing::info!(studies = buffered, "Flushing batch to warehouse");

        for batch in transformer.take_batches() {
            let spec = batch.spec();
            let staged = self.connector.bulk_load_staging(&batch).await?;
            let merged = self
                .connector
                .execute_merge(spec.name, spec.key_columns)
                .await?;

            tracing::debug!(table = spec.name, staged, merged, "Table batch merged");
            report.record_merge(spec.name, merged);
        }

        Ok(())
    }
}
