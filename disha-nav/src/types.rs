//! Map and position types.
//!
//! Features and floors follow the GeoJSON shape of the cartogram data:
//! coordinates are `[lng, lat]` pairs in degrees, and every feature carries
//! its owning floor in the `cartogram_id` property once decoded.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// `[lng, lat]` in degrees
pub type LngLat = [f64; 2];

/// Property naming the floor a feature belongs to
pub const FLOOR_PROPERTY: &str = "cartogram_id";

/// Property carrying the feature category code
pub const CATEGORY_PROPERTY: &str = "category";

/// Property carrying the display name
pub const NAME_PROPERTY: &str = "name";

/// Located point on a floor.
///
/// Produced by the fusion pipeline or derived from a picked feature.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Position {
    pub lng: f64,
    pub lat: f64,
    /// Floor the point lies on
    pub floor_id: String,
    /// Feature the point was derived from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl Position {
    pub fn new(lng: f64, lat: f64, floor_id: impl Into<String>) -> Self {
        Self {
            lng,
            lat,
            floor_id: floor_id.into(),
            feature_id: None,
            properties: Map::new(),
        }
    }

    pub fn with_feature(mut self, feature_id: impl Into<String>) -> Self {
        self.feature_id = Some(feature_id.into());
        self
    }

    pub fn lng_lat(&self) -> LngLat {
        [self.lng, self.lat]
    }
}

/// Feature geometry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(LngLat),
    Polygon(Vec<Vec<LngLat>>),
    MultiPolygon(Vec<Vec<Vec<LngLat>>>),
}

/// Selectable map entity (room, POI).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Feature {
    #[serde(default, deserialize_with = "id_from_value")]
    pub id: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
            properties: Map::new(),
        }
    }

    /// Owning floor, set by map decoding.
    pub fn floor_id(&self) -> Option<&str> {
        self.properties.get(FLOOR_PROPERTY).and_then(Value::as_str)
    }

    pub fn category(&self) -> Option<&str> {
        self.properties.get(CATEGORY_PROPERTY).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.get(NAME_PROPERTY).and_then(Value::as_str)
    }

    pub fn set_floor(&mut self, floor_id: &str) {
        self.properties
            .insert(FLOOR_PROPERTY.to_string(), Value::String(floor_id.to_string()));
    }
}

/// Named collection of features (cartogram).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Floor {
    #[serde(deserialize_with = "id_from_value")]
    pub id: String,
    /// Display label
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Floor {
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }
}

/// Versioned set of floors.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CartogramCollection {
    pub version: String,
    pub floors: Vec<Floor>,
}

impl CartogramCollection {
    pub fn floor(&self, id: &str) -> Option<&Floor> {
        self.floors.iter().find(|f| f.id == id)
    }

    pub fn has_floor(&self, id: &str) -> bool {
        self.floor(id).is_some()
    }

    /// First floor with features, else the second floor, else the first.
    pub fn default_floor(&self) -> Option<&Floor> {
        self.floors
            .iter()
            .find(|f| !f.features.is_empty())
            .or_else(|| self.floors.get(1))
            .or_else(|| self.floors.first())
    }

    /// Look a feature up across all floors.
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.floors.iter().find_map(|f| f.feature(id))
    }

    pub fn feature_count(&self) -> usize {
        self.floors.iter().map(|f| f.features.len()).sum()
    }
}

/// Accept string or numeric identifiers.
fn id_from_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(id: &str, features: usize) -> Floor {
        Floor {
            id: id.into(),
            name: id.to_uppercase(),
            features: (0..features)
                .map(|i| Feature::new(format!("{id}-{i}"), Geometry::Point([0.0, 0.0])))
                .collect(),
        }
    }

    #[test]
    fn test_default_floor_prefers_populated() {
        let collection = CartogramCollection {
            version: "2.0.0".into(),
            floors: vec![floor("b1", 0), floor("f1", 0), floor("f2", 3)],
        };
        assert_eq!(collection.default_floor().unwrap().id, "f2");
    }

    #[test]
    fn test_default_floor_fallbacks() {
        let two = CartogramCollection {
            version: "2".into(),
            floors: vec![floor("b1", 0), floor("f1", 0)],
        };
        assert_eq!(two.default_floor().unwrap().id, "f1");

        let one = CartogramCollection {
            version: "2".into(),
            floors: vec![floor("b1", 0)],
        };
        assert_eq!(one.default_floor().unwrap().id, "b1");

        let none = CartogramCollection {
            version: "2".into(),
            floors: vec![],
        };
        assert!(none.default_floor().is_none());
    }

    #[test]
    fn test_geometry_json_shape() {
        let feature: Feature = serde_json::from_str(
            r#"{"type":"Feature","id":42,"geometry":{"type":"Point","coordinates":[113.1,23.2]},
                "properties":{"name":"Gate","category":"090100"}}"#,
        )
        .unwrap();
        assert_eq!(feature.id, "42");
        assert_eq!(feature.geometry, Geometry::Point([113.1, 23.2]));
        assert_eq!(feature.name(), Some("Gate"));
        assert_eq!(feature.category(), Some("090100"));
        assert_eq!(feature.floor_id(), None);
    }
}
