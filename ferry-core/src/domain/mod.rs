//! Core domain types
//!
//! This module contains the core domain structures used across Ferry crates.
//! The orchestrator persists them; the client crate maps execution-service
//! payloads onto them.

pub mod connection;
pub mod identity;
pub mod pipeline;
