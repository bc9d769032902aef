use geo::Rect;
use rstar::{RTreeObject, AABB};

use crate::layer::TargetId;

/// R-tree entry: a target's bounding rectangle tagged with its id.
#[derive(Debug, Clone)]
pub(super) struct TargetBox {
    id: TargetId,
    rect: Rect<f64>,
}

impl TargetBox {
    pub(super) fn new(id: TargetId, rect: Rect<f64>) -> Self { Self { id, rect } }

    #[inline] pub(super) fn id(&self) -> TargetId { self.id }
}

impl RTreeObject for TargetBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope { envelope_of(&self.rect) }
}

/// Convert a geo rectangle into an rstar query envelope.
#[inline]
pub(super) fn envelope_of(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners(rect.min().into(), rect.max().into())
}
