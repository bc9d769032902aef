use std::collections::BTreeMap;

use ahash::AHashMap;
use geo::{Area, BoundingRect, MultiPolygon, Rect};
use tracing::{debug, warn};

use super::{normalize_field_name, FieldSchema, TargetId};

/// A source polygon and the numeric attributes to be redistributed from it.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// Load position, used to identify the record in errors and reports.
    pub id: usize,
    pub geometry: MultiPolygon<f64>,
    fields: AHashMap<String, f64>,
}

impl SourceRecord {
    /// Construct a record; field names are normalized. Names that normalize to nothing are
    /// dropped, and when two spellings collide the first one is kept.
    pub fn new<I, S>(id: usize, geometry: MultiPolygon<f64>, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut map = AHashMap::new();
        for (name, value) in fields {
            let normalized = normalize_field_name(name.as_ref());
            if normalized.is_empty() {
                debug!(record = id, "dropping source field with an empty name");
                continue;
            }
            if map.contains_key(&normalized) {
                warn!(record = id, field = %normalized, "duplicate spelling of a source field ignored");
                continue;
            }
            map.insert(normalized, value);
        }
        Self { id, geometry, fields: map }
    }

    /// Planar area of the geometry in working-CRS units.
    #[inline] pub fn area(&self) -> f64 { self.geometry.unsigned_area() }

    /// Bounding rectangle, or None for an empty geometry.
    #[inline] pub fn bounds(&self) -> Option<Rect<f64>> { self.geometry.bounding_rect() }

    /// Look up a field by any spelling of its name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(&normalize_field_name(name)).copied()
    }

    #[inline]
    pub(crate) fn field(&self, normalized: &str) -> Option<f64> {
        self.fields.get(normalized).copied()
    }

    /// Iterate over (normalized name, value) pairs in no particular order.
    #[inline]
    pub fn fields(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.fields.iter().map(|(name, &value)| (name.as_str(), value))
    }
}

/// A target polygon and its per-field accumulators.
#[derive(Debug, Clone)]
pub struct TargetRecord {
    pub id: TargetId,
    pub geometry: MultiPolygon<f64>,
    /// Non-numeric attributes of the target file, carried through to the output untouched.
    pub labels: BTreeMap<String, String>,
    fields: AHashMap<String, f64>,
}

impl TargetRecord {
    pub fn new(id: TargetId, geometry: MultiPolygon<f64>) -> Self {
        Self { id, geometry, labels: BTreeMap::new(), fields: AHashMap::new() }
    }

    /// Attach a pass-through label (builder style).
    pub fn with_label(mut self, name: &str, value: impl Into<String>) -> Self {
        self.labels.insert(normalize_field_name(name), value.into());
        self
    }

    #[inline] pub fn area(&self) -> f64 { self.geometry.unsigned_area() }

    #[inline] pub fn bounds(&self) -> Option<Rect<f64>> { self.geometry.bounding_rect() }

    /// Look up an accumulated field by any spelling of its name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(&normalize_field_name(name)).copied()
    }

    #[inline]
    pub(crate) fn field(&self, normalized: &str) -> Option<f64> {
        self.fields.get(normalized).copied()
    }

    /// Iterate over (normalized name, value) pairs in no particular order.
    #[inline]
    pub fn fields(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.fields.iter().map(|(name, &value)| (name.as_str(), value))
    }

    /// Reset every schema field to zero, dropping anything left from a previous run.
    pub(crate) fn reset_fields(&mut self, schema: &FieldSchema) {
        self.fields.clear();
        self.fields.extend(schema.names().map(|name| (name.to_string(), 0.0)));
    }

    /// Add `delta` to an already-normalized field.
    #[inline]
    pub(crate) fn add(&mut self, normalized: &str, delta: f64) {
        match self.fields.get_mut(normalized) {
            Some(value) => *value += delta,
            None => { self.fields.insert(normalized.to_string(), delta); }
        }
    }

    /// Overwrite a field by any spelling of its name.
    pub fn insert(&mut self, name: &str, value: f64) {
        self.set(&normalize_field_name(name), value);
    }

    #[inline]
    pub(crate) fn set(&mut self, normalized: &str, value: f64) {
        self.fields.insert(normalized.to_string(), value);
    }
}
