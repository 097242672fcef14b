//! # Document Store
//!
//! Narrow interface over a document database: named collections of JSON
//! objects queried with equality and integer range filters. The navigator and
//! the report pipeline only ever talk to [`DocumentStore`].

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Body of a stored document.
pub type DocumentData = Map<String, Value>;

/// Collection names used by the service.
pub mod collections {
    pub const BUILDINGS: &str = "buildings";
    pub const ZONES: &str = "zones";
    pub const FLOORS: &str = "floors";
    pub const UNITS: &str = "units";
    pub const POINTS: &str = "points";
    pub const SITES: &str = "sites";
    pub const REF_COUNTRIES: &str = "ref_countries";
    pub const REF_EMIRATES: &str = "ref_emirates";
    pub const REF_REGIONS: &str = "ref_regions";
    pub const REF_CITIES: &str = "ref_cities";
    pub const REF_DISTRICTS: &str = "ref_districts";
    pub const REF_SECTORS: &str = "ref_sectors";
    pub const COMPANIES: &str = "companies";
    pub const SECURITY_EVALUATIONS: &str = "security_evaluations";
    pub const EVALUATION_HISTORY: &str = "evaluation_history";
    pub const SECURITY_QUESTIONS: &str = "security_questions";
    pub const USER_ONBOARDING_REQUESTS: &str = "user_onboarding_requests";
    pub const JOBS: &str = "jobs";
}

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub data: DocumentData,
}

impl Document {
    pub fn new(id: impl Into<String>, data: DocumentData) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field).filter(|value| !value.is_null())
    }

    /// Non-empty string value of `field`; numbers are rendered as strings.
    pub fn string_field(&self, field: &str) -> Option<String> {
        value_as_string(self.get(field)?)
    }

    pub fn bool_field(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }
}

/// Render a scalar JSON value as a non-empty string.
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer view of a JSON value, accepting numeric strings.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A single query predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    /// `field == value`; a missing field never matches
    Eq { field: String, value: Value },
    /// `min <= field <= max` on integer fields
    Between { field: String, min: i64, max: i64 },
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn between(field: impl Into<String>, min: i64, max: i64) -> Self {
        Self::Between {
            field: field.into(),
            min,
            max,
        }
    }

    /// `is_active == true`
    pub fn active() -> Self {
        Self::eq("is_active", true)
    }

    pub fn matches(&self, data: &DocumentData) -> bool {
        match self {
            FieldFilter::Eq { field, value } => data.get(field).is_some_and(|v| v == value),
            FieldFilter::Between { field, min, max } => data
                .get(field)
                .and_then(value_as_i64)
                .is_some_and(|v| (*min..=*max).contains(&v)),
        }
    }
}

/// Errors raised by document store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("document {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Read/write access to named document collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of `collection` matching every filter, in a stable order.
    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
    ) -> Result<Document, StoreError>;

    /// Shallow-merges `patch` into the stored body.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: DocumentData,
    ) -> Result<Document, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
