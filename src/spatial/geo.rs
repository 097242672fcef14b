//! Geocoded payload normalization.
//!
//! Builds the `geo_data` object persisted with a spatial item. Malformed
//! polygon or entrance input drops that field only, with a warning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::models::spatial::GeoInputType;

/// Raw positioning input of the item form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoForm {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
    /// Array of points or JSON text of one.
    #[serde(default)]
    pub polygon: Option<Value>,
    /// Array of entrances or JSON text of one.
    #[serde(default)]
    pub entrances: Option<Value>,
}

/// Named access point of a site or building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entrance {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
}

/// Accept either a JSON value or JSON text of one.
fn decode(input: &Value, field: &str) -> Option<Value> {
    match input {
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => match serde_json::from_str(text) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(field, error = %err, "Ignoring unparseable geo input");
                None
            }
        },
        Value::Null => None,
        other => Some(other.clone()),
    }
}

fn pair_keys(geo_input: GeoInputType) -> (&'static str, &'static str) {
    match geo_input {
        GeoInputType::InternalFloor | GeoInputType::InternalUnit => ("x", "y"),
        GeoInputType::None | GeoInputType::ExternalGlobal => ("lat", "lng"),
    }
}

fn normalize_point(point: &Value, keys: (&str, &str)) -> Option<Value> {
    match point {
        Value::Array(pair) if pair.len() == 2 => {
            let a = pair[0].as_f64()?;
            let b = pair[1].as_f64()?;
            let mut object = Map::new();
            object.insert(keys.0.to_string(), json!(a));
            object.insert(keys.1.to_string(), json!(b));
            Some(Value::Object(object))
        }
        Value::Object(object) => {
            let has = |k: &str| object.get(k).is_some_and(Value::is_number);
            let lat_lng = has("lat") && has("lng");
            let x_y = has("x") && has("y");
            (lat_lng || x_y).then(|| point.clone())
        }
        _ => None,
    }
}

/// Normalize a polygon to object-form points.
///
/// Pairs become `{lat,lng}` (or `{x,y}` on internal levels); object points
/// pass through unchanged. Any malformed point discards the polygon.
pub fn normalize_polygon(input: &Value, geo_input: GeoInputType) -> Option<Vec<Value>> {
    let decoded = decode(input, "polygon")?;
    let Value::Array(points) = decoded else {
        tracing::warn!("Ignoring polygon that is not an array");
        return None;
    };

    let keys = pair_keys(geo_input);
    let normalized: Option<Vec<Value>> = points
        .iter()
        .map(|point| normalize_point(point, keys))
        .collect();

    if normalized.is_none() {
        tracing::warn!(points = points.len(), "Ignoring polygon with malformed points");
    }
    normalized.filter(|points| !points.is_empty())
}

/// Parse the entrance list; malformed input yields `None`.
pub fn parse_entrances(input: &Value) -> Option<Vec<Entrance>> {
    let decoded = decode(input, "entrances")?;
    match serde_json::from_value::<Vec<Entrance>>(decoded) {
        Ok(entrances) if entrances.is_empty() => None,
        Ok(entrances) => Some(entrances),
        Err(err) => {
            tracing::warn!(error = %err, "Ignoring malformed entrances");
            None
        }
    }
}

/// Assemble `geo_data` for a level's positioning mode; `None` when empty.
pub fn build_geo_data(geo_input: GeoInputType, form: &GeoForm) -> Option<Value> {
    let mut geo = Map::new();

    match geo_input {
        GeoInputType::ExternalGlobal => {
            if let (Some(lat), Some(lng)) = (form.lat, form.lng) {
                geo.insert("center".to_string(), json!({ "lat": lat, "lng": lng }));
            }
        }
        GeoInputType::InternalFloor => {
            if let (Some(x), Some(y)) = (form.x, form.y) {
                let mut coordinates = json!({ "x": x, "y": y });
                if let Some(z) = form.z {
                    coordinates["z"] = json!(z);
                }
                geo.insert("coordinates".to_string(), coordinates);
            }
        }
        GeoInputType::InternalUnit => {
            if let (Some(x), Some(y)) = (form.x, form.y) {
                geo.insert("coordinates".to_string(), json!({ "x": x, "y": y }));
            }
        }
        GeoInputType::None => {}
    }

    if let Some(polygon) = form
        .polygon
        .as_ref()
        .and_then(|input| normalize_polygon(input, geo_input))
    {
        geo.insert("polygon".to_string(), Value::Array(polygon));
    }

    if let Some(entrances) = form.entrances.as_ref().and_then(parse_entrances)
        && let Ok(value) = serde_json::to_value(entrances)
    {
        geo.insert("entrances".to_string(), value);
    }

    (!geo.is_empty()).then_some(Value::Object(geo))
}
