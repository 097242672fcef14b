//! # Spatial Mutations
//!
//! The `manageSpatialStructure` contract: one create, update or delete of a
//! single spatial document. [`SpatialMutator`] is the client-side seam the
//! navigator calls; [`StoreMutator`] applies requests to a [`DocumentStore`]
//! and backs the HTTP endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::spatial::SpatialLevel;
use crate::store::{DocumentData, DocumentStore, StoreError, value_as_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    Create,
    Update,
    Delete,
}

impl MutationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationAction::Create => "create",
            MutationAction::Update => "update",
            MutationAction::Delete => "delete",
        }
    }
}

/// Request body of `manageSpatialStructure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ManageRequest {
    /// Level of the document being changed
    pub target: SpatialLevel,
    pub action: MutationAction,
    /// Required for update and delete
    #[serde(default, alias = "docId", skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<DocumentData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ManageResponse {
    pub success: bool,
    /// Id of the created, updated or deleted document
    pub id: String,
}

/// Failure of a spatial mutation. The display text is shown to the operator
/// as-is.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("{0}")]
    Validation(String),
    #[error("{target} entries are read-only reference data")]
    ReadOnly { target: SpatialLevel },
    #[error("{target} '{id}' was not found")]
    NotFound { target: SpatialLevel, id: String },
    #[error("{0}")]
    Rejected(String),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl MutationError {
    /// Metric label for the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            MutationError::Validation(_) => "validation",
            MutationError::ReadOnly { .. } => "read_only",
            MutationError::NotFound { .. } => "not_found",
            MutationError::Rejected(_) => "rejected",
            MutationError::Storage(_) => "storage",
        }
    }
}

/// Endpoint performing spatial mutations.
#[async_trait]
pub trait SpatialMutator: Send + Sync {
    async fn manage(&self, request: ManageRequest) -> Result<ManageResponse, MutationError>;
}

/// Fields a caller may never set directly.
const RESERVED_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

fn timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn has_text(data: &DocumentData, field: &str) -> bool {
    data.get(field).and_then(value_as_string).is_some()
}

/// Applies mutations directly to the document store.
#[derive(Clone)]
pub struct StoreMutator {
    store: Arc<dyn DocumentStore>,
}

impl StoreMutator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn require_doc_id(request: &ManageRequest) -> Result<String, MutationError> {
        request
            .doc_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                MutationError::Validation(format!(
                    "doc_id is required to {} a {}",
                    request.action.as_str(),
                    request.target
                ))
            })
    }

    async fn create(
        &self,
        target: SpatialLevel,
        data: Option<DocumentData>,
    ) -> Result<ManageResponse, MutationError> {
        let mut data = data.ok_or_else(|| {
            MutationError::Validation(format!("data is required to create a {target}"))
        })?;
        for field in RESERVED_FIELDS {
            data.remove(field);
        }

        if !has_text(&data, "name_ar") && !has_text(&data, "name_en") {
            return Err(MutationError::Validation(format!(
                "a {target} needs a name in Arabic or English"
            )));
        }

        let populated: Vec<SpatialLevel> = target
            .parent_targets()
            .iter()
            .copied()
            .filter(|parent| has_text(&data, parent.id_field()))
            .collect();

        let parent = match populated.as_slice() {
            [parent] => Some(*parent),
            [] if target.parent_targets().is_empty() => None,
            [] => {
                return Err(MutationError::Validation(format!(
                    "a {target} must reference its parent"
                )));
            }
            _ => {
                return Err(MutationError::Validation(format!(
                    "a {target} must reference exactly one parent"
                )));
            }
        };

        if let Some(parent) = parent {
            let parent_id = data
                .get(parent.id_field())
                .and_then(value_as_string)
                .unwrap_or_default();
            if self.store.get(parent.collection(), &parent_id).await?.is_none() {
                return Err(MutationError::Validation(format!(
                    "parent {parent} '{parent_id}' does not exist"
                )));
            }

            if (target, parent) == (SpatialLevel::Zone, SpatialLevel::Site) {
                data.insert("is_outdoor".to_string(), Value::Bool(true));
            }
        }

        data.entry("is_active").or_insert(Value::Bool(true));
        let now = timestamp();
        data.insert("created_at".to_string(), now.clone());
        data.insert("updated_at".to_string(), now);

        let id = Uuid::new_v4().to_string();
        self.store.insert(target.collection(), &id, data).await?;

        tracing::info!(level = %target, id = %id, "Created spatial item");
        Ok(ManageResponse { success: true, id })
    }

    async fn update(
        &self,
        target: SpatialLevel,
        id: String,
        data: Option<DocumentData>,
    ) -> Result<ManageResponse, MutationError> {
        let mut patch = data.unwrap_or_default();
        for field in RESERVED_FIELDS {
            patch.remove(field);
        }
        for parent in target.parent_targets() {
            patch.remove(parent.id_field());
        }
        patch.insert("updated_at".to_string(), timestamp());

        match self.store.update(target.collection(), &id, patch).await {
            Ok(_) => {
                tracing::info!(level = %target, id = %id, "Updated spatial item");
                Ok(ManageResponse { success: true, id })
            }
            Err(StoreError::NotFound { .. }) => Err(MutationError::NotFound { target, id }),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(
        &self,
        target: SpatialLevel,
        id: String,
    ) -> Result<ManageResponse, MutationError> {
        match self.store.delete(target.collection(), &id).await {
            Ok(()) => {
                tracing::info!(level = %target, id = %id, "Deleted spatial item");
                Ok(ManageResponse { success: true, id })
            }
            Err(StoreError::NotFound { .. }) => Err(MutationError::NotFound { target, id }),
            Err(err) => Err(err.into()),
        }
    }

    async fn apply(&self, request: ManageRequest) -> Result<ManageResponse, MutationError> {
        let target = request.target;
        if target.is_reference() {
            return Err(MutationError::ReadOnly { target });
        }

        match request.action {
            MutationAction::Create => self.create(target, request.data).await,
            MutationAction::Update => {
                let id = Self::require_doc_id(&request)?;
                self.update(target, id, request.data).await
            }
            MutationAction::Delete => {
                let id = Self::require_doc_id(&request)?;
                self.delete(target, id).await
            }
        }
    }
}

#[async_trait]
impl SpatialMutator for StoreMutator {
    async fn manage(&self, request: ManageRequest) -> Result<ManageResponse, MutationError> {
        let target = request.target.as_str();
        let action = request.action.as_str();

        let result = self.apply(request).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => {
                tracing::warn!(level = target, action, error = %err, "Spatial mutation failed");
                err.kind()
            }
        };
        counter!(
            "spatial_mutations_total",
            "target" => target,
            "action" => action,
            "outcome" => outcome
        )
        .increment(1);

        result
    }
}
