#![doc = "Areal-weighting interpolation of polygon attributes onto a target polygon layer"]
pub mod config;
pub mod error;
pub mod geom;
pub mod interp;
pub mod io;
pub mod layer;
pub mod weight;

#[doc(inline)]
pub use config::{Config, ProjectionConfig};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use geom::{BooleanOverlap, OverlapResolver, Reprojector, SpatialIndex, TargetIndex};

#[doc(inline)]
pub use interp::{
    interpolate, Accumulated, InterpolationOptions, InterpolationReport, Interpolator, MissingFieldPolicy,
    DEFAULT_NO_DATA,
};

#[doc(inline)]
pub use layer::{FieldSchema, SourceLayer, SourceRecord, TargetId, TargetLayer, TargetRecord};

#[doc(inline)]
pub use weight::{IntensiveMode, WeightingPolicy};
