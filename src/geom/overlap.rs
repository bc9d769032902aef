use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon};

/// Computes how much of a target polygon a source polygon covers.
pub trait OverlapResolver: Sync {
    /// Area of `source ∩ target`, `0.0` when they only share bounding boxes or a boundary.
    /// Never negative or non-finite.
    fn intersection_area(&self, source: &MultiPolygon<f64>, target: &MultiPolygon<f64>) -> f64;
}

/// Exact polygon clipping with `geo`'s boolean operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanOverlap;

impl OverlapResolver for BooleanOverlap {
    fn intersection_area(&self, source: &MultiPolygon<f64>, target: &MultiPolygon<f64>) -> f64 {
        let (Some(a), Some(b)) = (source.bounding_rect(), target.bounding_rect()) else {
            return 0.0;
        };
        // Index candidates are a superset; clipping is the expensive part, so reject on boxes first.
        if !a.intersects(&b) {
            return 0.0;
        }

        let area = source.intersection(target).unsigned_area();
        if area.is_finite() && area > 0.0 { area } else { 0.0 }
    }
}
