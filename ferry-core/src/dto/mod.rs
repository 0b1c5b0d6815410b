//! Data Transfer Objects
//!
//! Request bodies accepted by the orchestrator API. The catalog and operation
//! shapes are also forwarded to the execution service by `ferry-client`.

pub mod connection;
pub mod pipeline;
