//! Shared fixtures for unit tests: an in-memory store and hand-written
//! doubles for the navigator's injected services.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, DbErr};
use serde_json::Value;

use crate::repositories::DocumentRepository;
use crate::spatial::mutation::{ManageRequest, ManageResponse, MutationError, SpatialMutator};
use crate::spatial::services::{DialogSpec, DialogService};
use crate::store::{Document, DocumentData, DocumentStore, FieldFilter, StoreError};

/// Object body of a `json!` literal.
pub fn object(value: Value) -> DocumentData {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// In-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub async fn setup_test_repository() -> DocumentRepository {
    DocumentRepository::new(setup_test_db().await)
}

/// Store wrapper counting queries, with a switch that makes every call fail.
pub struct CountingStore<S> {
    inner: S,
    queries: AtomicUsize,
    failing: AtomicBool,
}

impl<S: DocumentStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Database(DbErr::Custom(
                "store unavailable".to_string(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for CountingStore<S> {
    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.query(collection, filters).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check()?;
        self.inner.get(collection, id).await
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
    ) -> Result<Document, StoreError> {
        self.check()?;
        self.inner.insert(collection, id, data).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: DocumentData,
    ) -> Result<Document, StoreError> {
        self.check()?;
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete(collection, id).await
    }
}

/// Mutator that records every request and answers from a script.
#[derive(Default)]
pub struct RecordingMutator {
    requests: Mutex<Vec<ManageRequest>>,
    failure: Mutex<Option<String>>,
}

impl RecordingMutator {
    /// Every following call is rejected with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn requests(&self) -> Vec<ManageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpatialMutator for RecordingMutator {
    async fn manage(&self, request: ManageRequest) -> Result<ManageResponse, MutationError> {
        let id = request
            .doc_id
            .clone()
            .unwrap_or_else(|| "generated-id".to_string());
        self.requests.lock().unwrap().push(request);

        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(MutationError::Rejected(message)),
            None => Ok(ManageResponse { success: true, id }),
        }
    }
}

/// Dialog double answering confirmations with a fixed choice.
pub struct ScriptedDialogs {
    answer: bool,
    confirms: Mutex<Vec<DialogSpec>>,
    alerts: Mutex<Vec<DialogSpec>>,
}

impl ScriptedDialogs {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            confirms: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
        }
    }

    pub fn confirms(&self) -> Vec<DialogSpec> {
        self.confirms.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<DialogSpec> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DialogService for ScriptedDialogs {
    async fn confirm(&self, spec: DialogSpec) -> bool {
        self.confirms.lock().unwrap().push(spec);
        self.answer
    }

    async fn alert(&self, spec: DialogSpec) {
        self.alerts.lock().unwrap().push(spec);
    }
}
