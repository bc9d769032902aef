use geo::MultiPolygon;

use crate::error::{Error, Result};
use super::{FieldSchema, SourceRecord, TargetId, TargetRecord};

/// A loaded source layer: records plus the union of their numeric field names.
#[derive(Debug, Clone, Default)]
pub struct SourceLayer {
    pub schema: FieldSchema,
    pub records: Vec<SourceRecord>,
    /// Raw `.prj` text of the file the layer came from, if any.
    pub prj: Option<String>,
}

impl SourceLayer {
    pub fn new(records: Vec<SourceRecord>) -> Self {
        let schema = FieldSchema::new(
            records.iter().flat_map(|record| record.fields().map(|(name, _)| name))
        );
        Self { schema, records, prj: None }
    }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

/// A loaded target layer. `records[i].id == TargetId(i)` always holds.
#[derive(Debug, Clone, Default)]
pub struct TargetLayer {
    /// Names of the accumulated fields, set by the last interpolation into this layer.
    pub schema: FieldSchema,
    pub records: Vec<TargetRecord>,
    pub prj: Option<String>,
}

impl TargetLayer {
    /// Build a layer from bare geometries, assigning ids in order.
    pub fn from_geometries<I>(geometries: I) -> Self
    where
        I: IntoIterator<Item = MultiPolygon<f64>>,
    {
        Self {
            schema: FieldSchema::default(),
            records: geometries.into_iter().enumerate()
                .map(|(i, geometry)| TargetRecord::new(TargetId(i as u32), geometry))
                .collect(),
            prj: None,
        }
    }

    /// Build a layer from records whose ids must match their positions.
    pub fn from_records(records: Vec<TargetRecord>) -> Result<Self> {
        if let Some((i, record)) = records.iter().enumerate()
            .find(|(i, record)| record.id.index() != *i)
        {
            return Err(Error::config(format!(
                "target record at position {i} carries {}, ids must be assigned in order", record.id
            )));
        }
        Ok(Self { schema: FieldSchema::default(), records, prj: None })
    }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Get a record by id.
    #[inline]
    pub fn get(&self, id: TargetId) -> Option<&TargetRecord> { self.records.get(id.index()) }

    /// Union of all label names across records, sorted.
    pub fn label_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.iter()
            .flat_map(|record| record.labels.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
