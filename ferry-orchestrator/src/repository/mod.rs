//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository handles database operations for a specific domain entity;
//! `store` exposes them to the services behind the `MetadataStore` trait.

pub mod connection;
pub mod pipeline;
pub mod store;

// Re-export for convenience
pub use connection as connection_repository;
pub use pipeline as pipeline_repository;
pub use store::{MetadataStore, PgStore, StoreResult};
