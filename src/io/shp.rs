use std::{collections::BTreeMap, fmt, fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{self as shp, dbase::{FieldName, FieldValue, Record, TableWriterBuilder}, Reader, Shape};
use tracing::debug;

use crate::layer::{normalize_field_name, SourceLayer, SourceRecord, TargetId, TargetLayer, TargetRecord};
use super::ID_COLUMN;

/// Convert shapefile rings (outer rings each followed by their holes) into a geo MultiPolygon.
fn rings_to_geo<P>(rings: &[shp::PolygonRing<P>], xy: impl Fn(&P) -> (f64, f64)) -> MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn closed(mut coords: Vec<Coord<f64>>) -> LineString<f64> {
        if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
            if first != last { coords.push(first) }
        }
        LineString(coords)
    }

    let mut polys: Vec<Polygon<f64>> = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes: Vec<LineString<f64>> = Vec::new();

    for ring in rings {
        let (points, is_outer) = match ring {
            shp::PolygonRing::Outer(points) => (points, true),
            shp::PolygonRing::Inner(points) => (points, false),
        };
        let ls = closed(points.iter().map(|p| { let (x, y) = xy(p); Coord { x, y } }).collect());

        if is_outer {
            if let Some(ext) = exterior.take() {
                polys.push(Polygon::new(ext, std::mem::take(&mut holes)));
            }
            exterior = Some(ls);
        } else {
            holes.push(ls);
        }
    }
    if let Some(ext) = exterior {
        polys.push(Polygon::new(ext, holes));
    }

    MultiPolygon(polys)
}

/// Coerce a generic shape into an owned multipolygon, raising error if different shape.
fn shape_to_multipolygon(shape: Shape) -> Result<MultiPolygon<f64>> {
    match shape {
        Shape::Polygon(p) => Ok(rings_to_geo(p.rings(), |pt| (pt.x, pt.y))),
        Shape::PolygonM(p) => Ok(rings_to_geo(p.rings(), |pt| (pt.x, pt.y))),
        Shape::PolygonZ(p) => Ok(rings_to_geo(p.rings(), |pt| (pt.x, pt.y))),
        other => bail!("found non-Polygon shape in layer: {:?}", other.shapetype()),
    }
}

/// Convert geo::MultiPolygon<f64> to shapefile::Polygon (outer rings CW, holes CCW).
fn geo_to_shp(mp: &MultiPolygon<f64>) -> shp::Polygon {
    /// Get the signed area of a shapefile::Point list (negative for CW)
    fn signed_area(pts: &[shp::Point]) -> f64 {
        pts.windows(2).map(|w| w[0].x * w[1].y - w[1].x * w[0].y).sum::<f64>() / 2.0
    }

    fn ring(ls: &LineString<f64>, clockwise: bool) -> Vec<shp::Point> {
        let mut pts: Vec<shp::Point> = ls.coords().map(|c| shp::Point { x: c.x, y: c.y }).collect();
        if let (Some(first), Some(last)) = (pts.first().copied(), pts.last().copied()) {
            if first.x != last.x || first.y != last.y { pts.push(first) }
        }
        if (signed_area(&pts) > 0.0) == clockwise {
            pts.reverse();
        }
        pts
    }

    let mut rings = Vec::new();
    for poly in &mp.0 {
        rings.push(shp::PolygonRing::Outer(ring(poly.exterior(), true)));
        for hole in poly.interiors() {
            rings.push(shp::PolygonRing::Inner(ring(hole, false)));
        }
    }
    shp::Polygon::with_rings(rings)
}

/// Numeric reading of a dBase value; nulls and non-numeric text are None.
fn numeric_value(value: &FieldValue) -> Option<f64> {
    let v = match value {
        FieldValue::Numeric(v) => *v,
        FieldValue::Float(v) => v.map(f64::from),
        FieldValue::Double(v) => Some(*v),
        FieldValue::Integer(v) => Some(f64::from(*v)),
        FieldValue::Currency(v) => Some(*v),
        FieldValue::Character(Some(s)) => s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok(),
        _ => None,
    };
    v.filter(|v| v.is_finite())
}

/// Reads all shapes + attribute records from a given `.shp` file path.
fn read_shapes_and_records(path: &Path) -> Result<Vec<(Shape, Record)>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;

    let mut items = Vec::with_capacity(reader.shape_count()?);
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result
            .with_context(|| format!("Error reading shape+record from {}", path.display()))?;
        items.push((shape, record));
    }
    Ok(items)
}

/// Read the sibling `.prj` file, if there is one.
fn read_prj(path: &Path) -> Result<Option<String>> {
    let prj = path.with_extension("prj");
    if !prj.exists() {
        return Ok(None);
    }
    fs::read_to_string(&prj)
        .map(|text| Some(text.trim().to_string()))
        .with_context(|| format!("Failed to read projection file: {}", prj.display()))
}

/// Load a source layer: every polygon with its numeric attributes.
pub fn read_source_layer(path: &Path) -> Result<SourceLayer> {
    let records = read_shapes_and_records(path)?
        .into_iter().enumerate()
        .map(|(i, (shape, record))| {
            let geometry = shape_to_multipolygon(shape)
                .with_context(|| format!("record {i} of {}", path.display()))?;
            let fields = record.into_iter()
                .filter_map(|(name, value)| numeric_value(&value).map(|v| (name, v)));
            Ok(SourceRecord::new(i, geometry, fields))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut layer = SourceLayer::new(records);
    layer.prj = read_prj(path)?;
    debug!(path = %path.display(), records = layer.len(), fields = layer.schema.len(), "read source layer");
    Ok(layer)
}

/// Load a target layer: polygons with ids in file order and their character attributes as labels.
pub fn read_target_layer(path: &Path) -> Result<TargetLayer> {
    let records = read_shapes_and_records(path)?
        .into_iter().enumerate()
        .map(|(i, (shape, record))| {
            let geometry = shape_to_multipolygon(shape)
                .with_context(|| format!("record {i} of {}", path.display()))?;
            let mut target = TargetRecord::new(TargetId(i as u32), geometry);
            for (name, value) in record {
                if let FieldValue::Character(Some(text)) = value {
                    target.labels.insert(normalize_field_name(&name), text.trim().to_string());
                }
            }
            Ok(target)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut layer = TargetLayer::from_records(records)?;
    layer.prj = read_prj(path)?;
    debug!(path = %path.display(), records = layer.len(), "read target layer");
    Ok(layer)
}

/// dBase numeric width and decimals for accumulated fields; readers cap Numeric at 20.
const NUMERIC_WIDTH: u8 = 20;
const NUMERIC_DECIMALS: u8 = 8;

fn field_name(name: &str) -> Result<FieldName> {
    FieldName::try_from(name).map_err(|e| anyhow!("invalid dBase field name {name:?}: {e:?}"))
}

/// Write a target layer as a polygon shapefile: `TARGET_ID`, labels, then accumulated fields.
pub fn write_target_layer(path: &Path, layer: &TargetLayer) -> Result<()> {
    let labels = super::label_columns(layer);

    let mut builder = TableWriterBuilder::new()
        .add_numeric_field(field_name(ID_COLUMN)?, 10, 0);
    for label in &labels {
        let width = layer.records.iter()
            .filter_map(|t| t.labels.get(label))
            .map(|s| s.len())
            .max()
            .unwrap_or(1)
            .clamp(1, 254) as u8;
        builder = builder.add_character_field(field_name(label)?, width);
    }
    for field in layer.schema.names() {
        builder = builder.add_numeric_field(field_name(field)?, NUMERIC_WIDTH, NUMERIC_DECIMALS);
    }

    let mut writer = shapefile::Writer::from_path(path, builder)
        .with_context(|| format!("Failed to create shapefile: {}", path.display()))?;

    for target in &layer.records {
        if target.geometry.0.is_empty() {
            bail!("{} has an empty geometry and cannot be written as a polygon", target.id);
        }

        let mut record = Record::default();
        record.insert(ID_COLUMN.to_string(), FieldValue::Numeric(Some(f64::from(target.id.0))));
        for label in &labels {
            record.insert(label.clone(), FieldValue::Character(target.labels.get(label).cloned()));
        }
        for field in layer.schema.names() {
            record.insert(field.to_string(), FieldValue::Numeric(target.get(field)));
        }

        writer.write_shape_and_record(&geo_to_shp(&target.geometry), &record)
            .with_context(|| format!("Failed to write {} to {}", target.id, path.display()))?;
    }

    if let Some(prj) = &layer.prj {
        let prj_path = path.with_extension("prj");
        fs::write(&prj_path, prj)
            .with_context(|| format!("Failed to write projection file: {}", prj_path.display()))?;
    }
    Ok(())
}

/// Record count, geometry mix and attribute columns of a shapefile.
#[derive(Debug, Clone, Default)]
pub struct ShapefileSummary {
    pub records: usize,
    pub geometry: BTreeMap<&'static str, usize>,
    /// Column name → kind of the first non-null value seen.
    pub columns: BTreeMap<String, &'static str>,
    pub prj: Option<String>,
}

impl fmt::Display for ShapefileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of records: {}", self.records)?;
        writeln!(f, "Geometry mix:")?;
        for (kind, count) in &self.geometry {
            writeln!(f, "  - {kind}: {count}")?;
        }
        writeln!(f, "Attribute columns:")?;
        for (name, kind) in &self.columns {
            writeln!(f, "  - {name} ({kind})")?;
        }
        match &self.prj {
            Some(prj) => write!(f, "Projection: {prj}"),
            None => write!(f, "Projection: unknown (no .prj)"),
        }
    }
}

/// Summarize a shapefile without converting it into a layer.
pub fn describe_shapefile(path: &Path) -> Result<ShapefileSummary> {
    let items = read_shapes_and_records(path)?;
    let mut summary = ShapefileSummary { records: items.len(), prj: read_prj(path)?, ..Default::default() };

    for (shape, record) in items {
        let kind = match shape {
            Shape::Point(_) | Shape::PointM(_) | Shape::PointZ(_) => "Point",
            Shape::Polygon(_) | Shape::PolygonM(_) | Shape::PolygonZ(_) => "Polygon",
            Shape::NullShape => "Null",
            _ => "Other",
        };
        *summary.geometry.entry(kind).or_default() += 1;

        for (name, value) in record {
            let kind = match &value {
                FieldValue::Character(None) | FieldValue::Numeric(None) | FieldValue::Float(None) => continue,
                v if numeric_value(v).is_some() => "numeric",
                FieldValue::Character(_) => "text",
                _ => "other",
            };
            summary.columns.entry(normalize_field_name(&name)).or_insert(kind);
        }
    }
    Ok(summary)
}
