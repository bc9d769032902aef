use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use geo::MultiPolygon;
use serde_json::{json, Map, Value};

use crate::layer::TargetLayer;
use super::ID_COLUMN;

fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Value> = mp.0.iter()
        .map(|polygon| {
            let rings: Vec<Vec<[f64; 2]>> = std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ls| ls.coords().map(|c| [c.x, c.y]).collect())
                .collect();
            json!(rings)
        })
        .collect();

    json!({
        "type": "MultiPolygon",
        "coordinates": polygons,
    })
}

/// Export a target layer as a GeoJSON FeatureCollection.
///
/// Each feature carries its `TargetId` as both the feature `id` and a property, then its
/// labels, then every accumulated field.
pub fn to_geojson(layer: &TargetLayer) -> Value {
    let labels = super::label_columns(layer);

    let features: Vec<Value> = layer.records.iter()
        .map(|target| {
            let mut properties = Map::new();
            properties.insert(ID_COLUMN.to_string(), json!(target.id.0));
            for label in &labels {
                properties.insert(label.clone(), json!(target.labels.get(label)));
            }
            for field in layer.schema.names() {
                properties.insert(field.to_string(), json!(target.get(field)));
            }

            json!({
                "type": "Feature",
                "id": target.id.0,
                "geometry": multipolygon_to_geojson(&target.geometry),
                "properties": properties,
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// Write a target layer to a GeoJSON file.
pub fn write_target_layer(path: &Path, layer: &TargetLayer) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::geojson] Failed to create GeoJSON file: {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &to_geojson(layer))
        .with_context(|| format!("[io::geojson] Failed to write GeoJSON to {}", path.display()))
}
