//! # Facility Operations Library
//!
//! Core of the facility-management and guard-evaluation service: the spatial
//! hierarchy navigator, the evaluation aggregation pipeline, the document store
//! they read from, and the HTTP surface exposing them.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod evaluation;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod spatial;
pub mod store;
pub mod telemetry;
pub use migration;

#[cfg(test)]
pub(crate) mod test_support;
