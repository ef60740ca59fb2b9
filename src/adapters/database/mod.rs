//! Database abstraction layer
//!
//! The connector trait every backend implements, plus the factory that
//! selects one from configuration.

pub mod factory;
pub mod traits;

pub use factory::{create_connector, create_postgres_client};
pub use traits::{DatabaseConnector, LoadHistoryEntry, LoadStatus};
