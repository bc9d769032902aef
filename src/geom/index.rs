use geo::{MultiPolygon, Rect};
use rstar::RTree;
use tracing::debug;

use crate::layer::{TargetId, TargetRecord};
use super::bbox::{envelope_of, TargetBox};

/// Answers "which target polygons might intersect this rectangle".
///
/// Results are positions into the target slice the index was built from. A query may return
/// false positives (bounding boxes that intersect while the polygons do not) but must never
/// miss a true intersection.
pub trait SpatialIndex: Sync {
    fn query(&self, envelope: &Rect<f64>) -> Vec<usize>;
}

impl<T: SpatialIndex + ?Sized> SpatialIndex for &T {
    #[inline]
    fn query(&self, envelope: &Rect<f64>) -> Vec<usize> { (**self).query(envelope) }
}

/// R-tree over target bounding boxes.
#[derive(Debug, Clone)]
pub struct TargetIndex {
    rtree: RTree<TargetBox>,
    len: usize,
}

impl TargetIndex {
    /// Bulk-load an index over target records. Empty geometries are left out.
    pub fn new(targets: &[TargetRecord]) -> Self {
        Self::from_geometries(targets.iter().map(|target| &target.geometry))
    }

    /// Bulk-load an index over bare geometries, keyed by iteration position.
    pub fn from_geometries<'a, I>(geometries: I) -> Self
    where
        I: IntoIterator<Item = &'a MultiPolygon<f64>>,
    {
        use geo::BoundingRect;

        let mut skipped = 0usize;
        let boxes: Vec<TargetBox> = geometries.into_iter().enumerate()
            .filter_map(|(i, geometry)| match geometry.bounding_rect() {
                Some(rect) => Some(TargetBox::new(TargetId(i as u32), rect)),
                None => { skipped += 1; None }
            })
            .collect();

        if skipped > 0 {
            debug!(skipped, "left empty target geometries out of the spatial index");
        }

        Self { len: boxes.len(), rtree: RTree::bulk_load(boxes) }
    }

    /// Number of indexed geometries.
    #[inline] pub fn len(&self) -> usize { self.len }

    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }
}

impl SpatialIndex for TargetIndex {
    fn query(&self, envelope: &Rect<f64>) -> Vec<usize> {
        self.rtree
            .locate_in_envelope_intersecting(&envelope_of(envelope))
            .map(|entry| entry.id().index())
            .collect()
    }
}
