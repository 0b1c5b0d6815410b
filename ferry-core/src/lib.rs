//! Ferry Core
//!
//! Core types shared by the Ferry crates.
//!
//! This crate contains:
//! - Domain types: pipelines, connections, identities
//! - DTOs: request bodies for pipeline and connection operations
//!
//! Persistence lives in the orchestrator, remote calls in `ferry-client`.

pub mod domain;
pub mod dto;
