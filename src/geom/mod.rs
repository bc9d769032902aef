mod bbox;
mod index;
mod overlap;
mod proj;

pub use index::{SpatialIndex, TargetIndex};
pub use overlap::{BooleanOverlap, OverlapResolver};
pub use proj::{Reprojector, INMAP_GRID_PROJ4, INMAP_GRID_WKT};
