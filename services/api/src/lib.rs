//! services/api/src/lib.rs
//!
//! The `api` service library: configuration, error handling, the concrete
//! adapters for the core ports, and the Axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
