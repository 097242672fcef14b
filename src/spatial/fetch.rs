//! Children listing for one view of the spatial hierarchy.

use crate::models::spatial::{ParentRef, SpatialItem, SpatialLevel};
use crate::store::{DocumentStore, FieldFilter, StoreError};

/// Active items of `level` whose parent field matches `parent.id`.
async fn fetch_level(
    store: &dyn DocumentStore,
    level: SpatialLevel,
    parent_field: Option<&str>,
    parent_id: Option<&str>,
) -> Result<Vec<SpatialItem>, StoreError> {
    let mut filters = vec![FieldFilter::active()];
    if let (Some(field), Some(id)) = (parent_field, parent_id) {
        filters.push(FieldFilter::eq(field, id));
    }

    let docs = store.query(level.collection(), &filters).await?;
    Ok(docs
        .into_iter()
        .map(|doc| SpatialItem::from_document(doc, level))
        .collect())
}

fn sort_by_code(items: &mut [SpatialItem]) {
    items.sort_by(|a, b| {
        a.code
            .as_deref()
            .unwrap_or_default()
            .cmp(b.code.as_deref().unwrap_or_default())
    });
}

fn sort_by_arabic_name(items: &mut [SpatialItem]) {
    items.sort_by(|a, b| a.name_ar.cmp(&b.name_ar));
}

/// Buildings of a site plus the site's outdoor zones.
async fn fetch_site_children(
    store: &dyn DocumentStore,
    site_id: &str,
) -> Result<Vec<SpatialItem>, StoreError> {
    let mut items =
        fetch_level(store, SpatialLevel::Building, Some("site_id"), Some(site_id)).await?;

    let outdoor_zones = fetch_level(store, SpatialLevel::Zone, Some("site_id"), Some(site_id))
        .await?
        .into_iter()
        .filter(|zone| {
            zone.parent
                .as_ref()
                .is_some_and(|parent| parent.level == SpatialLevel::Site)
        })
        .map(|zone| zone.with_outdoor(true));
    items.extend(outdoor_zones);

    sort_by_arabic_name(&mut items);
    Ok(items)
}

/// Zones of a building plus the floors hung directly from it.
async fn fetch_building_children(
    store: &dyn DocumentStore,
    building_id: &str,
) -> Result<Vec<SpatialItem>, StoreError> {
    let mut items = fetch_level(
        store,
        SpatialLevel::Zone,
        Some("building_id"),
        Some(building_id),
    )
    .await?;
    items.extend(
        fetch_level(store, SpatialLevel::Floor, Some("zone_id"), Some(building_id)).await?,
    );

    sort_by_arabic_name(&mut items);
    Ok(items)
}

/// List the children shown when viewing `level` under `parent`.
///
/// Buildings under a site and zones under a building are merged listings of
/// two levels, each item tagged with the level it was fetched as.
pub async fn fetch_children(
    store: &dyn DocumentStore,
    level: SpatialLevel,
    parent: Option<&ParentRef>,
) -> Result<Vec<SpatialItem>, StoreError> {
    match (level, parent) {
        (SpatialLevel::Building, Some(parent)) if parent.level == SpatialLevel::Site => {
            fetch_site_children(store, &parent.id).await
        }
        (SpatialLevel::Zone, Some(parent)) if parent.level == SpatialLevel::Building => {
            fetch_building_children(store, &parent.id).await
        }
        (_, Some(parent)) => {
            let field = level.parent_field_for(parent.level);
            let mut items = fetch_level(store, level, field, Some(&parent.id)).await?;
            sort_by_code(&mut items);
            Ok(items)
        }
        (_, None) => {
            if level != SpatialLevel::ROOT {
                tracing::debug!(level = %level, "Listing level without a parent filter");
            }
            let mut items = fetch_level(store, level, None, None).await?;
            sort_by_code(&mut items);
            Ok(items)
        }
    }
}
