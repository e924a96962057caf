//! Cartogram map data decoding.
//!
//! Only format `2.x` is accepted. Decoding stamps every feature with its
//! owning floor so later lookups never need the enclosing floor.

use crate::error::{NavError, Result};
use crate::types::{CartogramCollection, Floor};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

#[derive(Deserialize)]
struct RawCollection {
    version: Value,
    #[serde(default)]
    floors: Vec<Floor>,
}

/// Decode a cartogram collection from JSON text.
pub fn decode_map_data(json: &str) -> Result<CartogramCollection> {
    let raw: RawCollection = serde_json::from_str(json)?;
    decode(raw)
}

/// Decode a cartogram collection from an already parsed JSON value.
pub fn decode_map_value(value: Value) -> Result<CartogramCollection> {
    let raw: RawCollection = serde_json::from_value(value)?;
    decode(raw)
}

/// Read and decode a map data file.
pub fn load_map_file<P: AsRef<Path>>(path: P) -> Result<CartogramCollection> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        NavError::MapData(format!("Failed to read {}: {}", path.as_ref().display(), e))
    })?;
    let collection = decode_map_data(&contents)?;
    info!(
        "Loaded map {:?}: {} floors, {} features",
        path.as_ref(),
        collection.floors.len(),
        collection.feature_count()
    );
    Ok(collection)
}

fn decode(raw: RawCollection) -> Result<CartogramCollection> {
    let version = match raw.version {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => {
            return Err(NavError::MapData(format!(
                "invalid map data version {}",
                other
            )));
        }
    };
    // Lexicographic, so "2", "2.0.1" and "2.10" pass while "10" does not
    if version.as_str() < "2" || version.as_str() >= "3" {
        return Err(NavError::MapData(format!(
            "invalid map data version, require: 2.x.x but get {}",
            version
        )));
    }

    let floors = raw
        .floors
        .into_iter()
        .map(|mut floor| {
            for (index, feature) in floor.features.iter_mut().enumerate() {
                feature.set_floor(&floor.id);
                if feature.id.is_empty() {
                    feature.id = feature
                        .properties
                        .get("id")
                        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                        .unwrap_or_else(|| format!("{}#{}", floor.id, index));
                }
            }
            debug!("Floor {} ({}): {} features", floor.id, floor.name, floor.features.len());
            floor
        })
        .collect();

    Ok(CartogramCollection { version, floors })
}
