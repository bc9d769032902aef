mod policy;

pub use policy::{IntensiveMode, WeightingPolicy};
