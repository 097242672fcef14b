//! Item form data and its mutation payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::spatial::SpatialLevel;
use crate::spatial::geo::{GeoForm, build_geo_data};
use crate::store::DocumentData;

/// Values entered in the create/edit form of a spatial item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialForm {
    #[serde(default)]
    pub name_ar: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub type_id: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub geo: GeoForm,
    /// Level-specific fields passed through unchanged.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl SpatialForm {
    pub fn named(name_ar: &str, name_en: &str) -> Self {
        Self {
            name_ar: name_ar.to_string(),
            name_en: name_en.to_string(),
            ..Default::default()
        }
    }

    /// Document body for a new item of `level`. Parent fields are left to
    /// the caller.
    pub fn to_payload(&self, level: SpatialLevel) -> DocumentData {
        let mut payload = self.to_update_payload(level);
        for field in ["name_ar", "name_en"] {
            payload.entry(field).or_insert_with(|| Value::String(String::new()));
        }
        payload.entry("is_active").or_insert(Value::Bool(true));
        payload
    }

    /// Patch for an existing item: only the fields the form supplied, so
    /// untouched values such as a deactivated flag stay as stored.
    pub fn to_update_payload(&self, level: SpatialLevel) -> DocumentData {
        let mut payload = self.extra.clone();

        for (field, name) in [("name_ar", &self.name_ar), ("name_en", &self.name_en)] {
            if let Some(name) = non_blank(Some(name.as_str())) {
                payload.insert(field.to_string(), Value::String(name));
            }
        }
        if let Some(is_active) = self.is_active {
            payload.insert("is_active".to_string(), Value::Bool(is_active));
        }

        if let Some(code) = non_blank(self.code.as_deref()) {
            payload.insert("code".to_string(), Value::String(code));
        }
        if level.has_type()
            && let Some(type_id) = non_blank(self.type_id.as_deref())
        {
            payload.insert("type_id".to_string(), Value::String(type_id));
        }
        if let Some(geo_data) = build_geo_data(level.geo_input_type(), &self.geo) {
            payload.insert("geo_data".to_string(), geo_data);
        }

        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_trims_names_and_defaults_active() {
        let form = SpatialForm {
            code: Some("  ".to_string()),
            ..SpatialForm::named(" مبنى ", "Tower ")
        };
        let payload = form.to_payload(SpatialLevel::Building);
        assert_eq!(payload["name_ar"], "مبنى");
        assert_eq!(payload["name_en"], "Tower");
        assert_eq!(payload["is_active"], json!(true));
        assert!(!payload.contains_key("code"));
        assert!(!payload.contains_key("geo_data"));
    }

    #[test]
    fn update_payload_keeps_unsupplied_fields_out() {
        let form = SpatialForm::named("", "Tower B");
        let patch = form.to_update_payload(SpatialLevel::Building);
        assert_eq!(patch["name_en"], "Tower B");
        assert!(!patch.contains_key("name_ar"));
        assert!(!patch.contains_key("is_active"));

        let deactivate = SpatialForm {
            is_active: Some(false),
            ..SpatialForm::default()
        };
        let patch = deactivate.to_update_payload(SpatialLevel::Building);
        assert_eq!(patch["is_active"], json!(false));
        assert_eq!(patch.len(), 1);
    }

    #[test]
    fn type_is_only_sent_for_typed_levels() {
        let form = SpatialForm {
            type_id: Some("t1".to_string()),
            ..SpatialForm::named("a", "b")
        };
        assert_eq!(form.to_payload(SpatialLevel::Site)["type_id"], "t1");
        assert!(!form.to_payload(SpatialLevel::City).contains_key("type_id"));
    }

    #[test]
    fn geo_inputs_follow_level_positioning() {
        let form: SpatialForm = serde_json::from_value(json!({
            "name_en": "Hall",
            "x": 3.0,
            "y": 4.0,
            "polygon": "[[0, 0], [0, 1], [1, 1]]",
            "extra": {"capacity": 40}
        }))
        .unwrap();

        let payload = form.to_payload(SpatialLevel::Unit);
        assert_eq!(payload["geo_data"]["coordinates"], json!({"x": 3.0, "y": 4.0}));
        assert_eq!(payload["geo_data"]["polygon"][2], json!({"x": 1.0, "y": 1.0}));
        assert_eq!(payload["capacity"], 40);
    }
}
