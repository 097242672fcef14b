//! # Spatial Hierarchy Handlers
//!
//! Children listings (including the merged site and building views) and the
//! `manageSpatialStructure` mutation endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::auth::OperatorAuth;
use crate::error::{ApiError, validation_error};
use crate::models::spatial::{ParentRef, SpatialItem, SpatialLevel};
use crate::server::AppState;
use crate::spatial::fetch_children;
use crate::spatial::mutation::{ManageRequest, ManageResponse, SpatialMutator, StoreMutator};

/// Query parameters for a children listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ChildrenQuery {
    /// Id of the selected parent item; omit to list every active item of the level
    pub parent_id: Option<String>,
    /// Level of the parent item (defaults to the level directly above)
    pub parent_level: Option<String>,
}

/// Items of one level under the selected parent
#[derive(Debug, Serialize, ToSchema)]
pub struct ChildrenResponse {
    pub level: SpatialLevel,
    pub parent: Option<ParentRef>,
    pub items: Vec<SpatialItem>,
}

fn parse_level(field: &str, raw: &str) -> Result<SpatialLevel, ApiError> {
    raw.parse::<SpatialLevel>()
        .map_err(|message| validation_error("Unknown spatial level", json!({ field: message })))
}

fn resolve_parent(
    level: SpatialLevel,
    query: ChildrenQuery,
) -> Result<Option<ParentRef>, ApiError> {
    let Some(parent_id) = query.parent_id.filter(|id| !id.trim().is_empty()) else {
        return Ok(None);
    };

    let parent_level = match query.parent_level.as_deref() {
        Some(raw) => parse_level("parent_level", raw)?,
        None => level.parent().ok_or_else(|| {
            validation_error(
                "Level has no parent",
                json!({ "parent_id": format!("{} is the top level", level.as_str()) }),
            )
        })?,
    };

    Ok(Some(ParentRef::new(parent_level, parent_id)))
}

/// List the children of a parent at one level
#[utoipa::path(
    get,
    path = "/api/v1/spatial/{level}/children",
    params(
        ("level" = String, Path, description = "Hierarchy level to list, e.g. `building`"),
        ChildrenQuery
    ),
    responses(
        (status = 200, description = "Active items of the level", body = ChildrenResponse, example = json!({
            "level": "building",
            "parent": { "level": "site", "id": "site-1" },
            "items": [
                {
                    "id": "zone-9",
                    "name_ar": "الساحة",
                    "name_en": "Yard",
                    "code": null,
                    "type_id": null,
                    "parent": { "level": "site", "id": "site-1" },
                    "is_outdoor": true,
                    "is_active": true,
                    "_type": "zone",
                    "geo_data": null
                }
            ]
        })),
        (status = 400, description = "Unknown level or parent", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "spatial"
)]
pub async fn list_children(
    State(state): State<AppState>,
    Path(level): Path<String>,
    Query(query): Query<ChildrenQuery>,
) -> Result<Json<ChildrenResponse>, ApiError> {
    let level = parse_level("level", &level)?;
    let parent = resolve_parent(level, query)?;

    let items = fetch_children(state.store.as_ref(), level, parent.as_ref()).await?;
    tracing::debug!(
        level = level.as_str(),
        parent = ?parent,
        count = items.len(),
        "Listed spatial children"
    );

    Ok(Json(ChildrenResponse {
        level,
        parent,
        items,
    }))
}

/// Create, update or delete a spatial entity
#[utoipa::path(
    post,
    path = "/api/v1/spatial/manage",
    request_body(content = ManageRequest, example = json!({
        "target": "zone",
        "action": "create",
        "data": { "name_ar": "الساحة", "name_en": "Yard", "site_id": "site-1" }
    })),
    responses(
        (status = 200, description = "Mutation applied", body = ManageResponse, example = json!({
            "success": true,
            "id": "0b9e3c2a-6f57-4b59-9a43-6d1f0b3f2c11"
        })),
        (status = 400, description = "Invalid payload or rejected mutation", body = ApiError),
        (status = 401, description = "Missing or invalid operator token", body = ApiError),
        (status = 403, description = "Reference level is read-only", body = ApiError),
        (status = 404, description = "Entity not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "spatial"
)]
pub async fn manage_spatial_structure(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    payload: Result<Json<ManageRequest>, JsonRejection>,
) -> Result<Json<ManageResponse>, ApiError> {
    let Json(request) = payload?;
    let mutator = StoreMutator::new(Arc::clone(&state.store));
    let response = mutator.manage(request).await?;
    Ok(Json(response))
}
