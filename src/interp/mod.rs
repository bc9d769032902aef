//! Areal-weighting interpolation: accumulation of source values into overlapping targets,
//! followed by normalization of weighted-average fields.

mod engine;
mod normalize;
mod report;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use engine::Interpolator;
pub use normalize::Accumulated;
pub use report::InterpolationReport;

use crate::error::Result;
use crate::geom::SpatialIndex;
use crate::layer::{SourceLayer, TargetLayer};
use crate::weight::WeightingPolicy;

/// Default marker written into weighted-average fields whose denominator accumulated to zero.
pub const DEFAULT_NO_DATA: f64 = -9999.0;

/// What to do with a source record that lacks a field the weighting policy needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingFieldPolicy {
    /// Drop the record's whole contribution, log it, and list it in the report.
    #[default]
    Skip,
    /// Fail the run with `Error::MissingField`.
    Abort,
}

impl fmt::Display for MissingFieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Self::Skip => "skip", Self::Abort => "abort" })
    }
}

impl FromStr for MissingFieldPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown missing-field policy {other:?} (expected skip or abort)")),
        }
    }
}

/// Run-time knobs of the engine that are not part of the weighting policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationOptions {
    pub on_missing: MissingFieldPolicy,
    pub no_data: f64,
    /// Spread accumulation over source records (and normalization over targets) with rayon.
    pub parallel: bool,
}

impl Default for InterpolationOptions {
    fn default() -> Self {
        Self { on_missing: MissingFieldPolicy::default(), no_data: DEFAULT_NO_DATA, parallel: false }
    }
}

/// Interpolate `sources` onto `targets` with default options and exact polygon clipping.
///
/// `index` must have been built over `targets.records`, in order.
pub fn interpolate<I: SpatialIndex>(
    sources: &SourceLayer,
    index: &I,
    targets: &mut TargetLayer,
    policy: &WeightingPolicy,
) -> Result<InterpolationReport> {
    Interpolator::new(index, policy.clone()).interpolate(sources, targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_policy_parses() {
        assert_eq!("Skip".parse::<MissingFieldPolicy>(), Ok(MissingFieldPolicy::Skip));
        assert_eq!("abort".parse::<MissingFieldPolicy>(), Ok(MissingFieldPolicy::Abort));
        assert!("ignore".parse::<MissingFieldPolicy>().is_err());
    }

    #[test]
    fn default_options() {
        let options = InterpolationOptions::default();
        assert_eq!(options.on_missing, MissingFieldPolicy::Skip);
        assert_eq!(options.no_data, DEFAULT_NO_DATA);
        assert!(!options.parallel);
    }
}
