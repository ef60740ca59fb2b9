//! ClinicalTrials.gov V2 API client
//!
//! Fetches study pages with retry and exponential backoff and streams the
//! individual raw studies through a bounded channel. The channel capacity is
//! one page, so extraction overlaps transformation without letting the
//! producer run ahead of the consumer.

use crate::adapters::ctgov::models::StudiesPage;
use crate::adapters::ctgov::StudySource;
use crate::config::ApiConfig;
use crate::domain::errors::ApiError;
use crate::domain::result::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// HTTP client for the V2 `/studies` endpoint
///
/// Holds one connection pool for the lifetime of a run. Cheap to clone; the
/// retry counter is shared across clones so run metrics see every attempt.
#[derive(Clone)]
pub struct CtgovApiClient {
    http: Client,
    config: ApiConfig,
    retries: Arc<AtomicU64>,
}

impl CtgovApiClient {
    /// Create a new API client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(30)))
            .build()
            .map_err(|e| ApiError::ConnectionFailed(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            retries: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Fetch one page, retrying transient failures with exponential backoff.
    ///
    /// A page that keeps failing surfaces as [`ApiError::RetriesExhausted`]
    /// carrying the token of the failed page; progress up to the previous
    /// page is already committed downstream.
    async fn fetch_page(
        &self,
        page_token: Option<&str>,
        filter: Option<&str>,
    ) -> std::result::Result<StudiesPage, ApiError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.try_fetch_page(page_token, filter).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(&self.config, attempt);
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying page fetch after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(ApiError::RetriesExhausted {
                        attempts: attempt,
                        page_token: page_token.map(|t| t.to_string()),
                        last_error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One request attempt, classified into the retry taxonomy
    async fn try_fetch_page(
        &self,
        page_token: Option<&str>,
        filter: Option<&str>,
    ) -> std::result::Result<StudiesPage, ApiError> {
        let url = format!("{}/studies", self.config.base_url.trim_end_matches('/'));

        let mut request = self
            .http
            .get(&url)
            .query(&[("pageSize", self.config.page_size.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }
        if let Some(filter) = filter {
            request = request.query(&[("filter.advanced", filter)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(e.to_string())
            } else {
                ApiError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        if status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::ServerError {
                status: status.as_u16(),
                message,
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::ClientError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<StudiesPage>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl StudySource for CtgovApiClient {
    async fn stream_studies(
        &self,
        updated_since: Option<DateTime<Utc>>,
    ) -> mpsc::Receiver<Result<Value>> {
        let (tx, rx) = mpsc::channel(self.config.page_size.max(1));
        let client = self.clone();
        let filter = updated_since.map(|watermark| build_delta_filter(watermark));

        if let Some(filter) = &filter {
            tracing::info!(filter = %filter, "Streaming studies with delta filter");
        } else {
            tracing::info!("Streaming all studies (no delta filter)");
        }

        tokio::spawn(async move {
            let mut page_token: Option<String> = None;
            let mut page_number: u64 = 0;

            loop {
                match client
                    .fetch_page(page_token.as_deref(), filter.as_deref())
                    .await
                {
                    Ok(page) => {
                        page_number += 1;
                        tracing::debug!(
                            page = page_number,
                            studies = page.studies.len(),
                            has_next = page.next_page_token.is_some(),
                            "Fetched page"
                        );

                        for study in page.studies {
                            if tx.send(Ok(study)).await.is_err() {
                                // Consumer went away; stop fetching.
                                return;
                            }
                        }

                        // The next token always comes from the last successful
                        // page; a retried page never re-derives it.
                        match page.next_page_token {
                            Some(token) => page_token = Some(token),
                            None => return,
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e.into())).await;
                        return;
                    }
                }
            }
        });

        rx
    }

    fn retry_count(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }
}

/// Advanced-filter expression for a delta load
///
/// Uses the UTC calendar date of the high-water mark; the API's
/// LastUpdatePostDate has day granularity.
fn build_delta_filter(watermark: DateTime<Utc>) -> String {
    format!(
        "AREA[LastUpdatePostDate]RANGE[{},MAX]",
        watermark.format("%Y-%m-%d")
    )
}

/// Backoff delay before the given (1-based) attempt is retried
fn backoff_delay(config: &ApiConfig, attempt: usize) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    let delay_ms =
        config.retry.initial_delay_ms as f64 * config.retry.backoff_multiplier.powi(exponent);
    Duration::from_millis((delay_ms as u64).min(config.retry.max_delay_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_delta_filter_uses_utc_calendar_date() {
        let watermark = Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 59).unwrap();
        assert_eq!(
            build_delta_filter(watermark),
            "AREA[LastUpdatePostDate]RANGE[2024-06-01,MAX]"
        );
    }

    #[test]
    fn test_backoff_grows_exponentially_and_caps() {
        let config = ApiConfig::default();

        assert_eq!(backoff_delay(&config, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(&config, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(&config, 3), Duration::from_millis(4000));
        assert_eq!(backoff_delay(&config, 4), Duration::from_millis(8000));
        // capped at max_delay_ms
        assert_eq!(backoff_delay(&config, 5), Duration::from_millis(10_000));
        assert_eq!(backoff_delay(&config, 9), Duration::from_millis(10_000));
    }

    #[test]
    fn test_client_construction() {
        let client = CtgovApiClient::new(ApiConfig::default()).unwrap();
        assert_eq!(client.retry_count(), 0);
    }
}
