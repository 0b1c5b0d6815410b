//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services coordinate the metadata store with the remote services.

pub mod connection;
pub mod enrichment;
pub mod pipeline;
pub mod reconcile;
