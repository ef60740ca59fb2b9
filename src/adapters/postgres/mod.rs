//! PostgreSQL backend
//!
//! Pool client plus the connector implementation: staging loads via binary
//! COPY, natural-key merges, dead-letter and load-history bookkeeping.

pub mod client;
pub mod connector;

pub use client::PostgresClient;
pub use connector::PostgresConnector;
