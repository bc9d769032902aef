//! CSV writing of the target attribute table (no geometry).

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{Column, CsvWriter, NamedFrom}, series::Series};

use crate::layer::TargetLayer;
use super::ID_COLUMN;

/// Build the attribute table of a target layer: id, labels, then accumulated fields.
pub fn to_dataframe(layer: &TargetLayer) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(1 + layer.schema.len());

    let ids: Vec<u32> = layer.records.iter().map(|t| t.id.0).collect();
    columns.push(Series::new(ID_COLUMN.into(), ids).into());

    for label in super::label_columns(layer) {
        let values: Vec<Option<String>> = layer.records.iter()
            .map(|t| t.labels.get(&label).cloned())
            .collect();
        columns.push(Series::new(label.as_str().into(), values).into());
    }

    for field in layer.schema.names() {
        let values: Vec<Option<f64>> = layer.records.iter().map(|t| t.get(field)).collect();
        columns.push(Series::new(field.into(), values).into());
    }

    DataFrame::new(columns).context("[io::csv] Failed to assemble attribute table")
}

/// Write a target layer's attribute table to a CSV file.
pub fn write_target_layer(path: &Path, layer: &TargetLayer) -> Result<()> {
    let mut df = to_dataframe(layer)?;
    let file = File::create(path)
        .with_context(|| format!("[io::csv] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(&mut df)
        .with_context(|| format!("[io::csv] Failed to write CSV to {}", path.display()))
}
