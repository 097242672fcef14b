//! End-to-end tests for spatial listings and `manageSpatialStructure`.

mod test_utils;

use serde_json::json;
use test_utils::{TestApp, item_ids};

async fn app_with_sector() -> TestApp {
    let app = TestApp::new().await.unwrap();
    app.seed(
        "ref_sectors",
        "sec-1",
        json!({"name_ar": "القطاع", "name_en": "Sector 1", "is_active": true}),
    )
    .await
    .unwrap();
    app
}

async fn create(app: &TestApp, target: &str, data: serde_json::Value) -> String {
    let (status, body) = app
        .manage(json!({"target": target, "action": "create", "data": data}))
        .await
        .unwrap();
    assert_eq!(status, 200, "create {target} failed: {body}");
    assert_eq!(body["success"], true);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn created_hierarchy_is_listed_level_by_level() {
    let app = app_with_sector().await;

    let site = create(
        &app,
        "site",
        json!({"name_ar": "الموقع", "name_en": "HQ", "code": "S-01", "sector_id": "sec-1"}),
    )
    .await;
    let building = create(
        &app,
        "building",
        json!({"name_ar": "ب", "name_en": "Tower", "site_id": site}),
    )
    .await;
    let yard = create(
        &app,
        "zone",
        json!({"name_ar": "أ", "name_en": "Yard", "site_id": site}),
    )
    .await;

    let (status, body) = app
        .get("/api/v1/spatial/site/children?parent_id=sec-1")
        .await
        .unwrap();
    assert_eq!(status, 200);
    assert_eq!(item_ids(&body), vec![site.clone()]);

    // Site view merges buildings with the site's outdoor zones
    let (_, body) = app
        .get(&format!("/api/v1/spatial/building/children?parent_id={site}"))
        .await
        .unwrap();
    assert_eq!(item_ids(&body), vec![yard.clone(), building.clone()]);
    assert_eq!(body["items"][0]["is_outdoor"], true);
    assert_eq!(body["items"][0]["_type"], "zone");

    // An outdoor zone lists its floors like any zone
    let floor = create(&app, "floor", json!({"name_en": "Ground", "zone_id": yard})).await;
    let (_, body) = app
        .get(&format!(
            "/api/v1/spatial/floor/children?parent_id={yard}&parent_level=zone"
        ))
        .await
        .unwrap();
    assert_eq!(item_ids(&body), vec![floor]);
}

#[tokio::test]
async fn building_view_merges_zones_with_direct_floors() {
    let app = TestApp::new().await.unwrap();
    app.seed(
        "zones",
        "z1",
        json!({"name_ar": "ج", "building_id": "b1", "is_active": true}),
    )
    .await
    .unwrap();
    app.seed(
        "floors",
        "f1",
        json!({"name_ar": "ا", "zone_id": "b1", "is_active": true}),
    )
    .await
    .unwrap();
    app.seed(
        "zones",
        "z2",
        json!({"name_ar": "د", "building_id": "b1", "is_active": false}),
    )
    .await
    .unwrap();

    let (status, body) = app
        .get("/api/v1/spatial/zone/children?parent_id=b1")
        .await
        .unwrap();
    assert_eq!(status, 200);
    assert_eq!(item_ids(&body), vec!["f1", "z1"]);
    assert_eq!(body["items"][0]["_type"], "floor");
}

#[tokio::test]
async fn standard_levels_sort_by_code() {
    let app = TestApp::new().await.unwrap();
    for (id, code) in [("u2", "U-02"), ("u1", "U-01"), ("u3", "U-03")] {
        app.seed(
            "units",
            id,
            json!({"name_en": id, "code": code, "floor_id": "f1", "is_active": true}),
        )
        .await
        .unwrap();
    }

    let (_, body) = app
        .get("/api/v1/spatial/unit/children?parent_id=f1")
        .await
        .unwrap();
    assert_eq!(item_ids(&body), vec!["u1", "u2", "u3"]);
}

#[tokio::test]
async fn create_validates_parent_reference() {
    let app = app_with_sector().await;

    let (status, body) = app
        .manage(json!({"target": "site", "action": "create", "data": {"name_en": "HQ"}}))
        .await
        .unwrap();
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (status, body) = app
        .manage(json!({
            "target": "building",
            "action": "create",
            "data": {"name_en": "Tower", "site_id": "missing"}
        }))
        .await
        .unwrap();
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("does not exist"));
}

#[tokio::test]
async fn update_and_delete_round_trip_through_listing() {
    let app = app_with_sector().await;
    let site = create(&app, "site", json!({"name_en": "HQ", "sector_id": "sec-1"})).await;

    let (status, _) = app
        .manage(json!({
            "target": "site",
            "action": "update",
            "docId": site,
            "data": {"name_en": "Head Office", "sector_id": "elsewhere"}
        }))
        .await
        .unwrap();
    assert_eq!(status, 200);

    let (_, body) = app
        .get("/api/v1/spatial/site/children?parent_id=sec-1")
        .await
        .unwrap();
    assert_eq!(body["items"][0]["name_en"], "Head Office");

    let (status, _) = app
        .manage(json!({"target": "site", "action": "delete", "doc_id": site}))
        .await
        .unwrap();
    assert_eq!(status, 200);

    let (_, body) = app
        .get("/api/v1/spatial/site/children?parent_id=sec-1")
        .await
        .unwrap();
    assert!(item_ids(&body).is_empty());

    let (status, body) = app
        .manage(json!({"target": "site", "action": "delete", "doc_id": site}))
        .await
        .unwrap();
    assert_eq!(status, 404);
    assert_eq!(body["details"]["id"], site);
}

#[tokio::test]
async fn reference_levels_are_read_only() {
    let app = app_with_sector().await;
    let (status, body) = app
        .manage(json!({
            "target": "sector",
            "action": "update",
            "docId": "sec-1",
            "data": {"name_en": "Renamed"}
        }))
        .await
        .unwrap();
    assert_eq!(status, 403);
    assert_eq!(body["code"], "FORBIDDEN");
}
