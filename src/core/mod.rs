//! Business logic
//!
//! Validation, transformation and run orchestration. Everything here is
//! backend-agnostic; external systems are reached through the adapter
//! traits.

pub mod etl;
pub mod transform;
pub mod validate;
