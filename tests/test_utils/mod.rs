//! Test utilities for HTTP-level integration tests.
//!
//! Builds the full router over an in-memory SQLite database with all
//! migrations applied, plus helpers for seeding documents and reading
//! JSON responses.

#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use facility_ops::config::AppConfig;
use facility_ops::migration::{Migrator, MigratorTrait};
use facility_ops::server::{AppState, create_app};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;

pub const OPERATOR_TOKEN: &str = "integration-operator-token";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Full application over a fresh database, with one operator token.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let config = AppConfig {
            profile: "test".to_string(),
            operator_tokens: vec![OPERATOR_TOKEN.to_string()],
            ..Default::default()
        };
        let state = AppState::new(config, setup_test_db().await?);
        Ok(Self {
            router: create_app(state.clone()),
            state,
        })
    }

    /// Inserts a raw document, bypassing the mutation rules.
    pub async fn seed(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        let Value::Object(map) = data else {
            anyhow::bail!("seed data for {collection}/{id} must be a JSON object");
        };
        self.state.store.insert(collection, id, map).await?;
        Ok(())
    }

    pub async fn get(&self, uri: &str) -> Result<(u16, Value)> {
        let request = Request::builder().uri(uri).body(Body::empty())?;
        self.send(request).await
    }

    /// POSTs to the manage endpoint with the operator token.
    pub async fn manage(&self, body: Value) -> Result<(u16, Value)> {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/spatial/manage")
            .header("content-type", "application/json")
            .header("Authorization", format!("Bearer {OPERATOR_TOKEN}"))
            .body(Body::from(body.to_string()))?;
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Result<(u16, Value)> {
        let response: Response<Body> = self.router.clone().oneshot(request).await?;
        let status = response.status().as_u16();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }
}

/// Ids of the `items` array of a children listing, in order.
pub fn item_ids(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
