//! ClinicalTrials.gov API adapter
//!
//! [`StudySource`] is the seam between extraction and the rest of the
//! pipeline: the orchestrator only ever consumes a stream of raw study
//! objects, so tests can substitute an in-memory source.

pub mod client;
pub mod models;

use crate::domain::result::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;

pub use client::CtgovApiClient;

/// A lazy, finite sequence of raw study objects
#[async_trait]
pub trait StudySource: Send + Sync {
    /// Start streaming studies, optionally bounded to those updated since
    /// the given high-water mark.
    ///
    /// Studies arrive one at a time through the returned channel. A fatal
    /// extraction error is delivered in-band as the final `Err` item, after
    /// which the channel closes.
    async fn stream_studies(
        &self,
        updated_since: Option<DateTime<Utc>>,
    ) -> mpsc::Receiver<Result<Value>>;

    /// Total page-fetch retries performed so far, for run metrics
    fn retry_count(&self) -> u64;
}
