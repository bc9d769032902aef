use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::layer::{TargetLayer, TargetRecord};
use crate::weight::WeightingPolicy;
use super::{InterpolationOptions, InterpolationReport};

/// Targets whose accumulation phase has completed. Normalization consumes it, so phase 2
/// can neither run before phase 1 nor twice.
#[derive(Debug)]
pub struct Accumulated<'a> {
    targets: &'a mut TargetLayer,
    policy: &'a WeightingPolicy,
    options: &'a InterpolationOptions,
    report: InterpolationReport,
}

impl<'a> Accumulated<'a> {
    pub(super) fn new(
        targets: &'a mut TargetLayer,
        policy: &'a WeightingPolicy,
        options: &'a InterpolationOptions,
        report: InterpolationReport,
    ) -> Self {
        Self { targets, policy, options, report }
    }

    /// Raw accumulated totals, before weighted fields are divided by their denominators.
    #[inline] pub fn targets(&self) -> &TargetLayer { &*self.targets }

    /// The report of the accumulation phase so far.
    #[inline] pub fn report(&self) -> &InterpolationReport { &self.report }

    /// Phase 2: divide each weighted field by its accumulated denominator. Targets with a zero
    /// denominator get the no-data marker and an `UndefinedNormalization` warning.
    pub fn normalize(self) -> InterpolationReport {
        let Self { targets, policy, options, mut report } = self;
        let no_data = options.no_data;

        if policy.is_empty() {
            return report;
        }

        let undefined: Vec<Error> = if options.parallel {
            targets.records.par_iter_mut()
                .flat_map_iter(|target| normalize_target(target, policy, no_data))
                .collect()
        } else {
            targets.records.iter_mut()
                .flat_map(|target| normalize_target(target, policy, no_data))
                .collect()
        };

        if !undefined.is_empty() {
            warn!(
                count = undefined.len(),
                no_data,
                "weighted fields with zero denominator were set to the no-data marker"
            );
        }
        report.warnings.extend(undefined);

        info!(
            sources = report.sources,
            contributing = report.contributing,
            overlaps = report.overlaps,
            warnings = report.warnings.len(),
            "interpolation finished"
        );
        report
    }
}

/// Normalize one target's weighted fields, returning a warning per undefined mean.
fn normalize_target(target: &mut TargetRecord, policy: &WeightingPolicy, no_data: f64) -> Vec<Error> {
    let mut undefined = Vec::new();
    for (field, denominator) in policy.iter() {
        let total = target.field(denominator).unwrap_or(0.0);
        if total == 0.0 {
            debug!(id = %target.id, field, denominator, "zero denominator");
            target.set(field, no_data);
            undefined.push(Error::UndefinedNormalization {
                target: target.id,
                field: field.to_string(),
                denominator: denominator.to_string(),
            });
        } else {
            let sum = target.field(field).unwrap_or(0.0);
            target.set(field, sum / total);
        }
    }
    undefined
}
