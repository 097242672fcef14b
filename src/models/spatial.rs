//! Spatial hierarchy model
//!
//! The fixed 12-level containment tree (country down to point) and the typed
//! view of a spatial document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::spatial::services::{Language, resolve_bilingual};
use crate::store::{Document, collections};

/// How instances of a level are positioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GeoInputType {
    None,
    /// `center.{lat,lng}`
    ExternalGlobal,
    /// `coordinates.{x,y,z}`, z optional
    InternalFloor,
    /// `coordinates.{x,y}`
    InternalUnit,
}

/// One level of the spatial hierarchy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum SpatialLevel {
    Country,
    Emirate,
    Region,
    City,
    District,
    Sector,
    Site,
    Building,
    Zone,
    Floor,
    Unit,
    Point,
}

impl SpatialLevel {
    pub const ALL: [SpatialLevel; 12] = [
        SpatialLevel::Country,
        SpatialLevel::Emirate,
        SpatialLevel::Region,
        SpatialLevel::City,
        SpatialLevel::District,
        SpatialLevel::Sector,
        SpatialLevel::Site,
        SpatialLevel::Building,
        SpatialLevel::Zone,
        SpatialLevel::Floor,
        SpatialLevel::Unit,
        SpatialLevel::Point,
    ];

    pub const ROOT: SpatialLevel = SpatialLevel::Country;

    pub fn as_str(self) -> &'static str {
        match self {
            SpatialLevel::Country => "country",
            SpatialLevel::Emirate => "emirate",
            SpatialLevel::Region => "region",
            SpatialLevel::City => "city",
            SpatialLevel::District => "district",
            SpatialLevel::Sector => "sector",
            SpatialLevel::Site => "site",
            SpatialLevel::Building => "building",
            SpatialLevel::Zone => "zone",
            SpatialLevel::Floor => "floor",
            SpatialLevel::Unit => "unit",
            SpatialLevel::Point => "point",
        }
    }

    /// Name of the field other documents use to reference an item of this level.
    pub fn id_field(self) -> &'static str {
        match self {
            SpatialLevel::Country => "country_id",
            SpatialLevel::Emirate => "emirate_id",
            SpatialLevel::Region => "region_id",
            SpatialLevel::City => "city_id",
            SpatialLevel::District => "district_id",
            SpatialLevel::Sector => "sector_id",
            SpatialLevel::Site => "site_id",
            SpatialLevel::Building => "building_id",
            SpatialLevel::Zone => "zone_id",
            SpatialLevel::Floor => "floor_id",
            SpatialLevel::Unit => "unit_id",
            SpatialLevel::Point => "point_id",
        }
    }

    pub fn parent(self) -> Option<SpatialLevel> {
        self.parent_targets().first().copied()
    }

    pub fn child(self) -> Option<SpatialLevel> {
        match self {
            SpatialLevel::Country => Some(SpatialLevel::Emirate),
            SpatialLevel::Emirate => Some(SpatialLevel::Region),
            SpatialLevel::Region => Some(SpatialLevel::City),
            SpatialLevel::City => Some(SpatialLevel::District),
            SpatialLevel::District => Some(SpatialLevel::Sector),
            SpatialLevel::Sector => Some(SpatialLevel::Site),
            SpatialLevel::Site => Some(SpatialLevel::Building),
            SpatialLevel::Building => Some(SpatialLevel::Zone),
            SpatialLevel::Zone => Some(SpatialLevel::Floor),
            SpatialLevel::Floor => Some(SpatialLevel::Unit),
            SpatialLevel::Unit => Some(SpatialLevel::Point),
            SpatialLevel::Point => None,
        }
    }

    /// Levels an item may hang from, nearest first. The first entry is the
    /// regular parent.
    pub fn parent_targets(self) -> &'static [SpatialLevel] {
        match self {
            SpatialLevel::Country => &[],
            SpatialLevel::Emirate => &[SpatialLevel::Country],
            SpatialLevel::Region => &[SpatialLevel::Emirate],
            SpatialLevel::City => &[SpatialLevel::Region],
            SpatialLevel::District => &[SpatialLevel::City],
            SpatialLevel::Sector => &[SpatialLevel::District],
            SpatialLevel::Site => &[SpatialLevel::Sector],
            SpatialLevel::Building => &[SpatialLevel::Site],
            SpatialLevel::Zone => &[SpatialLevel::Building, SpatialLevel::Site],
            SpatialLevel::Floor => &[SpatialLevel::Zone],
            SpatialLevel::Unit => &[SpatialLevel::Floor, SpatialLevel::Zone],
            SpatialLevel::Point => &[SpatialLevel::Unit],
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            SpatialLevel::Country => collections::REF_COUNTRIES,
            SpatialLevel::Emirate => collections::REF_EMIRATES,
            SpatialLevel::Region => collections::REF_REGIONS,
            SpatialLevel::City => collections::REF_CITIES,
            SpatialLevel::District => collections::REF_DISTRICTS,
            SpatialLevel::Sector => collections::REF_SECTORS,
            SpatialLevel::Site => collections::SITES,
            SpatialLevel::Building => collections::BUILDINGS,
            SpatialLevel::Zone => collections::ZONES,
            SpatialLevel::Floor => collections::FLOORS,
            SpatialLevel::Unit => collections::UNITS,
            SpatialLevel::Point => collections::POINTS,
        }
    }

    /// Instances carry a `type_id` classifier.
    pub fn has_type(self) -> bool {
        self >= SpatialLevel::Site
    }

    /// Instances come from a read-only lookup collection.
    pub fn is_reference(self) -> bool {
        self <= SpatialLevel::Sector
    }

    pub fn geo_input_type(self) -> GeoInputType {
        match self {
            SpatialLevel::Country | SpatialLevel::Emirate | SpatialLevel::Region => {
                GeoInputType::None
            }
            SpatialLevel::City
            | SpatialLevel::District
            | SpatialLevel::Sector
            | SpatialLevel::Site
            | SpatialLevel::Building
            | SpatialLevel::Zone => GeoInputType::ExternalGlobal,
            SpatialLevel::Floor => GeoInputType::InternalFloor,
            SpatialLevel::Unit | SpatialLevel::Point => GeoInputType::InternalUnit,
        }
    }

    /// Field holding the reference to a parent of `parent_level`, if that
    /// level is a legal parent; otherwise the regular parent's field.
    pub fn parent_field_for(self, parent_level: SpatialLevel) -> Option<&'static str> {
        if self.parent_targets().contains(&parent_level) {
            Some(parent_level.id_field())
        } else {
            self.parent().map(SpatialLevel::id_field)
        }
    }
}

impl fmt::Display for SpatialLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpatialLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SpatialLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown spatial level '{value}'"))
    }
}

/// Reference to the item an entry hangs from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ParentRef {
    pub level: SpatialLevel,
    pub id: String,
}

impl ParentRef {
    pub fn new(level: SpatialLevel, id: impl Into<String>) -> Self {
        Self {
            level,
            id: id.into(),
        }
    }
}

/// Typed view of a spatial document.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SpatialItem {
    pub id: String,
    pub name_ar: String,
    pub name_en: String,
    pub code: Option<String>,
    pub type_id: Option<String>,
    pub parent: Option<ParentRef>,
    pub is_outdoor: bool,
    pub is_active: bool,
    /// Level the item was fetched as; merged listings mix two levels.
    #[serde(rename = "_type")]
    pub item_type: SpatialLevel,
    pub geo_data: Option<Value>,
    /// Remaining document fields.
    #[schema(value_type = Object)]
    pub extra: Map<String, Value>,
}

impl SpatialItem {
    /// Build the view of `doc` as an item of `level`.
    pub fn from_document(doc: Document, level: SpatialLevel) -> Self {
        let parent = level.parent_targets().iter().find_map(|target| {
            doc.string_field(target.id_field())
                .map(|id| ParentRef::new(*target, id))
        });

        if parent.is_none() && level != SpatialLevel::ROOT {
            tracing::warn!(
                level = %level,
                id = %doc.id,
                "Spatial item has no parent reference"
            );
        }

        let is_outdoor = doc.bool_field("is_outdoor").unwrap_or(false)
            || (level == SpatialLevel::Zone
                && parent.as_ref().is_some_and(|p| p.level == SpatialLevel::Site));

        let name_ar = doc.string_field("name_ar").unwrap_or_default();
        let name_en = doc.string_field("name_en").unwrap_or_default();
        let code = doc.string_field("code");
        let type_id = doc.string_field("type_id");
        let is_active = doc.bool_field("is_active").unwrap_or(true);
        let geo_data = doc.get("geo_data").cloned();

        let Document { id, mut data } = doc;
        for key in [
            "id",
            "name_ar",
            "name_en",
            "code",
            "type_id",
            "is_active",
            "is_outdoor",
            "geo_data",
        ] {
            data.remove(key);
        }
        if let Some(parent) = &parent {
            data.remove(parent.level.id_field());
        }

        Self {
            id,
            name_ar,
            name_en,
            code,
            type_id,
            parent,
            is_outdoor,
            is_active,
            item_type: level,
            geo_data,
            extra: data,
        }
    }

    pub fn with_outdoor(mut self, is_outdoor: bool) -> Self {
        self.is_outdoor = is_outdoor;
        self
    }

    /// Zone attached directly to a site.
    pub fn is_outdoor_zone(&self) -> bool {
        self.item_type == SpatialLevel::Zone && self.is_outdoor
    }

    /// Name in `language`, then the other language, then the id.
    pub fn display_name(&self, language: Language) -> &str {
        resolve_bilingual(
            language,
            Some(self.name_ar.as_str()),
            Some(self.name_en.as_str()),
        )
        .unwrap_or(&self.id)
    }
}

/// One step of the navigation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BreadcrumbItem {
    /// Listing level the item was picked from.
    pub level: SpatialLevel,
    /// Level of the picked item itself.
    pub item_level: SpatialLevel,
    /// Level shown after picking the item.
    pub descends_to: SpatialLevel,
    pub id: String,
    pub name: String,
}

impl BreadcrumbItem {
    pub fn parent_ref(&self) -> ParentRef {
        ParentRef::new(self.item_level, self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, value: Value) -> Document {
        Document::new(id, value.as_object().cloned().unwrap())
    }

    #[test]
    fn hierarchy_is_a_single_chain() {
        let mut level = SpatialLevel::ROOT;
        let mut visited = vec![level];
        while let Some(child) = level.child() {
            assert_eq!(child.parent(), Some(level));
            level = child;
            visited.push(level);
        }
        assert_eq!(visited, SpatialLevel::ALL.to_vec());
        assert_eq!(level, SpatialLevel::Point);
        assert_eq!(SpatialLevel::ROOT.parent(), None);
    }

    #[test]
    fn reference_and_type_flags_split_at_site() {
        assert!(SpatialLevel::Sector.is_reference());
        assert!(!SpatialLevel::Sector.has_type());
        assert!(!SpatialLevel::Site.is_reference());
        assert!(SpatialLevel::Site.has_type());
        assert_eq!(SpatialLevel::Floor.geo_input_type(), GeoInputType::InternalFloor);
    }

    #[test]
    fn parent_field_resolution() {
        assert_eq!(
            SpatialLevel::Unit.parent_field_for(SpatialLevel::Zone),
            Some("zone_id")
        );
        assert_eq!(
            SpatialLevel::Unit.parent_field_for(SpatialLevel::Floor),
            Some("floor_id")
        );
        assert_eq!(
            SpatialLevel::Unit.parent_field_for(SpatialLevel::Site),
            Some("floor_id")
        );
        assert_eq!(SpatialLevel::Country.parent_field_for(SpatialLevel::Site), None);
    }

    #[test]
    fn level_parses_from_lowercase_names() {
        assert_eq!("building".parse::<SpatialLevel>(), Ok(SpatialLevel::Building));
        assert_eq!("Zone".parse::<SpatialLevel>(), Ok(SpatialLevel::Zone));
        assert!("galaxy".parse::<SpatialLevel>().is_err());
    }

    #[test]
    fn indoor_zone_prefers_building_parent() {
        let item = SpatialItem::from_document(
            doc(
                "z1",
                json!({"name_ar": "منطقة", "building_id": "b1", "site_id": "s1", "extra": 1}),
            ),
            SpatialLevel::Zone,
        );
        assert_eq!(item.parent, Some(ParentRef::new(SpatialLevel::Building, "b1")));
        assert!(!item.is_outdoor_zone());
        assert_eq!(item.extra.get("site_id"), Some(&json!("s1")));
        assert!(item.extra.get("building_id").is_none());
    }

    #[test]
    fn site_parented_zone_is_outdoor() {
        let item = SpatialItem::from_document(
            doc("z2", json!({"site_id": "s1"})),
            SpatialLevel::Zone,
        );
        assert_eq!(item.parent, Some(ParentRef::new(SpatialLevel::Site, "s1")));
        assert!(item.is_outdoor_zone());
        assert!(item.is_active);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let item = SpatialItem::from_document(
            doc("u9", json!({"floor_id": "f1", "name_en": "Lobby"})),
            SpatialLevel::Unit,
        );
        assert_eq!(item.display_name(Language::Ar), "Lobby");

        let nameless =
            SpatialItem::from_document(doc("u10", json!({"floor_id": "f1"})), SpatialLevel::Unit);
        assert_eq!(nameless.display_name(Language::En), "u10");
    }
}
