//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! and expose them through the [`DocumentStore`](crate::store::DocumentStore) interface.

pub mod document;
pub mod json_filter;

pub use document::DocumentRepository;
