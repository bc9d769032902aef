//! Reading and writing layers, organized by format.
//!
//! - `shp` - ESRI Shapefile, for both input layers and the output layer
//! - `geojson` - GeoJSON FeatureCollection output
//! - `csv` - attribute table output without geometry

pub mod csv;
pub mod geojson;
pub mod shp;

use std::{fmt, path::Path, str::FromStr};

use anyhow::Result;
use tracing::debug;

use crate::layer::TargetLayer;

/// Name of the output column holding each target's `TargetId`.
pub const ID_COLUMN: &str = "TARGET_ID";

/// Output formats for a finished target layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Shapefile,
    Geojson,
    Csv,
}

impl Format {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "shp" => Some(Self::Shapefile),
            "geojson" | "json" => Some(Self::Geojson),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Self::Shapefile => "shapefile", Self::Geojson => "geojson", Self::Csv => "csv" })
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shapefile" | "shp" => Ok(Self::Shapefile),
            "geojson" => Ok(Self::Geojson),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format {other:?}")),
        }
    }
}

/// Write a finished target layer in the given format.
pub fn write_target_layer(path: &Path, layer: &TargetLayer, format: Format) -> Result<()> {
    match format {
        Format::Shapefile => shp::write_target_layer(path, layer),
        Format::Geojson => geojson::write_target_layer(path, layer),
        Format::Csv => csv::write_target_layer(path, layer),
    }
}

/// Label columns to write: labels that collide with the id column or an accumulated field
/// are dropped, since the accumulated value is the one the output is for.
pub(crate) fn label_columns(layer: &TargetLayer) -> Vec<String> {
    layer.label_names().into_iter()
        .filter(|name| {
            let keep = name != ID_COLUMN && !layer.schema.contains_normalized(name);
            if !keep { debug!(label = %name, "label shadowed by an output column, dropped"); }
            keep
        })
        .collect()
}
