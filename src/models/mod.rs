//! # Data Models
//!
//! Persistence entities and the typed views the navigator and report pipeline
//! build from raw documents.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod document;
pub mod evaluation;
pub mod spatial;

pub use document::Entity as DocumentEntity;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "facility-ops".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
