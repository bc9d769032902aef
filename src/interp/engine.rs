use ahash::AHashMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geom::{BooleanOverlap, OverlapResolver, SpatialIndex};
use crate::layer::{SourceLayer, SourceRecord, TargetLayer, TargetRecord};
use crate::weight::{IntensiveMode, WeightingPolicy};
use super::{Accumulated, InterpolationOptions, InterpolationReport, MissingFieldPolicy};

/// One addition into one target accumulator.
#[derive(Debug, Clone, Copy)]
struct Contribution<'s> {
    target: usize,
    field: &'s str,
    delta: f64,
}

/// The result of examining a single source record.
enum Outcome<'s> {
    Contributed { contributions: Vec<Contribution<'s>>, overlaps: usize },
    Skipped(Error),
}

/// Sparse accumulator keyed by (target position, field); one per rayon worker in parallel runs.
#[derive(Default)]
struct Partial<'s> {
    sums: AHashMap<(usize, &'s str), f64>,
    skipped: Vec<Error>,
    contributing: usize,
    overlaps: usize,
}

impl<'s> Partial<'s> {
    fn absorb(&mut self, outcome: Outcome<'s>) {
        match outcome {
            Outcome::Contributed { contributions, overlaps } => {
                if overlaps > 0 { self.contributing += 1; }
                self.overlaps += overlaps;
                for c in contributions {
                    *self.sums.entry((c.target, c.field)).or_insert(0.0) += c.delta;
                }
            }
            Outcome::Skipped(err) => self.skipped.push(err),
        }
    }

    fn merge(mut self, mut other: Self) -> Self {
        if self.sums.len() < other.sums.len() {
            std::mem::swap(&mut self.sums, &mut other.sums);
        }
        for (key, delta) in other.sums {
            *self.sums.entry(key).or_insert(0.0) += delta;
        }
        self.skipped.append(&mut other.skipped);
        self.contributing += other.contributing;
        self.overlaps += other.overlaps;
        self
    }
}

/// The areal-weighting engine: a spatial index over the targets, an overlap resolver, and a
/// validated weighting policy.
#[derive(Debug, Clone)]
pub struct Interpolator<I, R = BooleanOverlap> {
    index: I,
    resolver: R,
    policy: WeightingPolicy,
    options: InterpolationOptions,
}

impl<I: SpatialIndex> Interpolator<I, BooleanOverlap> {
    /// `index` must have been built over the target records the engine will be run against.
    pub fn new(index: I, policy: WeightingPolicy) -> Self {
        Self { index, resolver: BooleanOverlap, policy, options: InterpolationOptions::default() }
    }
}

impl<I: SpatialIndex, R: OverlapResolver> Interpolator<I, R> {
    /// Swap the overlap resolver.
    pub fn with_resolver<R2: OverlapResolver>(self, resolver: R2) -> Interpolator<I, R2> {
        Interpolator { index: self.index, resolver, policy: self.policy, options: self.options }
    }

    pub fn with_options(mut self, options: InterpolationOptions) -> Self {
        self.options = options;
        self
    }

    #[inline] pub fn policy(&self) -> &WeightingPolicy { &self.policy }

    #[inline] pub fn options(&self) -> &InterpolationOptions { &self.options }

    /// Run both phases: accumulate every source record, then normalize every target.
    pub fn interpolate(&self, sources: &SourceLayer, targets: &mut TargetLayer) -> Result<InterpolationReport> {
        Ok(self.accumulate(sources, targets)?.normalize())
    }

    /// Phase 1. Validates the policy against the source schema, resets every target field in
    /// that schema to zero, and adds each source record's contributions.
    ///
    /// Fails fast on degenerate source geometry, and on missing policy fields under
    /// [`MissingFieldPolicy::Abort`]; on any error the targets keep their previous schema and
    /// values. Target values are only meaningful after [`Accumulated::normalize`].
    pub fn accumulate<'a>(&'a self, sources: &SourceLayer, targets: &'a mut TargetLayer) -> Result<Accumulated<'a>> {
        self.policy.validate(&sources.schema)?;

        info!(
            sources = sources.len(),
            targets = targets.len(),
            fields = sources.schema.len(),
            weighted = self.policy.iter().count(),
            mode = %self.policy.mode(),
            parallel = self.options.parallel,
            "accumulating"
        );

        // Targets stay untouched until every source record has been examined, so a failed run
        // leaves them as they were.
        let partial = if self.options.parallel {
            sources.records.par_iter()
                .map(|record| self.contributions(record, &targets.records))
                .try_fold(Partial::default, |mut acc, outcome| {
                    acc.absorb(outcome?);
                    Ok::<_, Error>(acc)
                })
                .try_reduce(Partial::default, |a, b| Ok(a.merge(b)))?
        } else {
            let mut acc = Partial::default();
            for record in &sources.records {
                acc.absorb(self.contributions(record, &targets.records)?);
            }
            acc
        };

        targets.schema = sources.schema.clone();
        for target in &mut targets.records {
            target.reset_fields(&sources.schema);
        }
        for ((target, field), delta) in partial.sums {
            targets.records[target].add(field, delta);
        }

        let mut report = InterpolationReport {
            sources: sources.len(),
            contributing: partial.contributing,
            overlaps: partial.overlaps,
            warnings: partial.skipped,
        };
        report.sort_skipped();

        debug!(contributing = report.contributing, overlaps = report.overlaps, "accumulation finished");

        Ok(Accumulated::new(targets, &self.policy, &self.options, report))
    }

    /// Compute every contribution of one source record without touching the targets.
    fn contributions<'s>(&self, record: &'s SourceRecord, targets: &[TargetRecord]) -> Result<Outcome<'s>> {
        let area = record.area();
        if !(area.is_finite() && area > 0.0) {
            return Err(Error::DegenerateGeometry { record: record.id, area });
        }

        if let Some(field) = self.missing_field(record) {
            let err = Error::MissingField { record: record.id, field: field.to_string() };
            return match self.options.on_missing {
                MissingFieldPolicy::Abort => Err(err),
                MissingFieldPolicy::Skip => {
                    warn!(record = record.id, field, "skipping source record without a weighting field");
                    Ok(Outcome::Skipped(err))
                }
            };
        }

        // Positive area implies a non-empty geometry.
        let Some(bounds) = record.bounds() else {
            return Err(Error::DegenerateGeometry { record: record.id, area });
        };

        let mut candidates = self.index.query(&bounds);
        candidates.sort_unstable();
        candidates.dedup();

        let mut contributions = Vec::new();
        let mut overlaps = 0;
        for pos in candidates {
            let target = targets.get(pos).ok_or_else(|| Error::config(format!(
                "spatial index returned position {pos} but the target layer has {} records", targets.len()
            )))?;

            let isect = self.resolver.intersection_area(&record.geometry, &target.geometry);
            if isect <= 0.0 {
                continue;
            }
            overlaps += 1;
            let fraction = isect / area;

            for (field, value) in record.fields() {
                let delta = match self.policy.denominator(field) {
                    None => value * fraction,
                    Some(denominator) => {
                        // Presence was checked by missing_field.
                        let Some(weight) = record.field(denominator) else { continue };
                        match self.policy.mode() {
                            IntensiveMode::DenominatorWeightedNoArea => value * weight,
                            IntensiveMode::AreaWeighted => value * weight * fraction,
                        }
                    }
                };
                contributions.push(Contribution { target: pos, field, delta });
            }
        }

        Ok(Outcome::Contributed { contributions, overlaps })
    }

    /// The first policy field (weighted field, then its denominator) the record lacks.
    fn missing_field<'p>(&'p self, record: &SourceRecord) -> Option<&'p str> {
        self.policy.iter()
            .flat_map(|(field, denominator)| [field, denominator])
            .find(|name| record.field(name).is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    use crate::geom::TargetIndex;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0),
        ]])
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn partial_merge_sums_shared_keys() {
        let mut a = Partial::default();
        a.absorb(Outcome::Contributed {
            contributions: vec![Contribution { target: 0, field: "POP", delta: 1.5 }],
            overlaps: 1,
        });
        let mut b = Partial::default();
        b.absorb(Outcome::Contributed {
            contributions: vec![
                Contribution { target: 0, field: "POP", delta: 2.0 },
                Contribution { target: 1, field: "POP", delta: 4.0 },
            ],
            overlaps: 2,
        });
        b.absorb(Outcome::Skipped(Error::MissingField { record: 3, field: "POP".into() }));

        let merged = a.merge(b);
        assert_close(merged.sums[&(0, "POP")], 3.5);
        assert_close(merged.sums[&(1, "POP")], 4.0);
        assert_eq!(merged.contributing, 2);
        assert_eq!(merged.overlaps, 3);
        assert_eq!(merged.skipped.len(), 1);
    }

    #[test]
    fn duplicate_candidates_are_counted_once() {
        struct Stuttering<'a>(&'a TargetIndex);
        impl SpatialIndex for Stuttering<'_> {
            fn query(&self, envelope: &geo::Rect<f64>) -> Vec<usize> {
                let mut hits = self.0.query(envelope);
                hits.extend(hits.clone());
                hits
            }
        }

        let sources = SourceLayer::new(vec![SourceRecord::new(0, rect(0.0, 0.0, 2.0, 1.0), [("nox", 10.0)])]);
        let mut targets = TargetLayer::from_geometries([rect(0.0, 0.0, 1.0, 1.0), rect(1.0, 0.0, 2.0, 1.0)]);
        let index = TargetIndex::new(&targets.records);

        let report = Interpolator::new(Stuttering(&index), WeightingPolicy::extensive())
            .interpolate(&sources, &mut targets)
            .unwrap();

        assert_eq!(report.overlaps, 2);
        assert_close(targets.records[0].get("nox").unwrap(), 5.0);
        assert_close(targets.records[1].get("nox").unwrap(), 5.0);
    }

    #[test]
    fn index_out_of_step_with_targets_is_an_error() {
        let sources = SourceLayer::new(vec![SourceRecord::new(0, rect(0.0, 0.0, 1.0, 1.0), [("nox", 1.0)])]);
        let other = TargetLayer::from_geometries([rect(5.0, 5.0, 6.0, 6.0), rect(0.0, 0.0, 1.0, 1.0)]);
        let index = TargetIndex::new(&other.records);
        let mut targets = TargetLayer::from_geometries([rect(0.0, 0.0, 1.0, 1.0)]);

        let result = Interpolator::new(&index, WeightingPolicy::extensive()).interpolate(&sources, &mut targets);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn failed_run_leaves_targets_untouched() {
        let sources = SourceLayer::new(vec![
            SourceRecord::new(0, rect(0.0, 0.0, 1.0, 1.0), [("pop", 5.0)]),
            SourceRecord::new(1, rect(2.0, 0.0, 2.0, 1.0), [("pop", 1.0)]),
        ]);
        for parallel in [false, true] {
            let mut targets = TargetLayer::from_geometries([rect(0.0, 0.0, 3.0, 1.0)]);
            targets.records[0].insert("jobs", 2.0);
            let index = TargetIndex::new(&targets.records);
            let options = InterpolationOptions { parallel, ..Default::default() };

            let result = Interpolator::new(&index, WeightingPolicy::extensive())
                .with_options(options)
                .interpolate(&sources, &mut targets);

            assert!(matches!(result, Err(Error::DegenerateGeometry { record: 1, .. })), "parallel={parallel}");
            assert!(targets.schema.is_empty());
            assert_eq!(targets.records[0].get("pop"), None);
            assert_eq!(targets.records[0].get("jobs"), Some(2.0));
        }
    }
}
