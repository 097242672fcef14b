//! Document repository for database operations
//!
//! This module provides the DocumentRepository struct which implements
//! [`DocumentStore`] on top of the SeaORM `documents` table. Collection
//! scoping and field predicates run in SQL against the JSON body; see
//! [`json_filter`](super::json_filter) for the per-backend translation.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde_json::Value;

use super::json_filter;
use crate::models::document::{self, Entity as DocumentEntity};
use crate::store::{Document, DocumentData, DocumentStore, FieldFilter, StoreError};

/// Repository for document database operations
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    /// Database connection pool
    db: DatabaseConnection,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<document::Model>, StoreError> {
        let model = DocumentEntity::find_by_id((collection.to_string(), id.to_string()))
            .one(&self.db)
            .await?;
        Ok(model)
    }
}

fn to_document(model: document::Model) -> Option<Document> {
    match model.data {
        Value::Object(data) => Some(Document::new(model.id, data)),
        other => {
            tracing::warn!(
                collection = %model.collection,
                id = %model.id,
                kind = json_kind(&other),
                "Skipping document whose body is not a JSON object"
            );
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, StoreError> {
        let backend = self.db.get_database_backend();
        let mut query =
            DocumentEntity::find().filter(document::Column::Collection.eq(collection));

        // Predicates the backend cannot express are checked on the loaded rows
        let mut residual = Vec::new();
        for filter in filters {
            match json_filter::condition(backend, filter) {
                Some(condition) => query = query.filter(condition),
                None => residual.push(filter),
            }
        }

        let models = query
            .order_by_asc(document::Column::Id)
            .all(&self.db)
            .await?;

        let documents: Vec<Document> = models
            .into_iter()
            .filter_map(to_document)
            .filter(|doc| residual.iter().all(|filter| filter.matches(&doc.data)))
            .collect();

        tracing::debug!(
            collection,
            filters = filters.len(),
            residual = residual.len(),
            matched = documents.len(),
            "Document query completed"
        );

        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.find_model(collection, id).await?.and_then(to_document))
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
    ) -> Result<Document, StoreError> {
        if self.find_model(collection, id).await?.is_some() {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let now = Utc::now();
        let model = document::ActiveModel {
            collection: Set(collection.to_string()),
            id: Set(id.to_string()),
            data: Set(Value::Object(data.clone())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        model.insert(&self.db).await?;

        Ok(Document::new(id, data))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: DocumentData,
    ) -> Result<Document, StoreError> {
        let model = self
            .find_model(collection, id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        let mut merged = match &model.data {
            Value::Object(existing) => existing.clone(),
            _ => DocumentData::new(),
        };
        merged.extend(patch);

        let mut active = model.into_active_model();
        active.data = Set(Value::Object(merged.clone()));
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await?;

        Ok(Document::new(id, merged))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let result = DocumentEntity::delete_by_id((collection.to_string(), id.to_string()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }
}
