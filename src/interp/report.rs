use crate::error::Error;
use crate::layer::TargetId;

/// What happened during an interpolation run, beyond the values themselves.
#[derive(Debug, Default)]
pub struct InterpolationReport {
    /// Source records visited.
    pub sources: usize,
    /// Source records that added to at least one target.
    pub contributing: usize,
    /// (source, target) pairs with a positive intersection area.
    pub overlaps: usize,
    /// Recoverable per-record conditions: skipped sources (`Error::MissingField`) followed by
    /// targets left without a weighted mean (`Error::UndefinedNormalization`).
    pub warnings: Vec<Error>,
}

impl InterpolationReport {
    /// True when no record was skipped and every weighted mean is defined.
    #[inline] pub fn is_clean(&self) -> bool { self.warnings.is_empty() }

    /// Source records whose contribution was dropped because of a missing field.
    pub fn skipped_records(&self) -> impl Iterator<Item = usize> + '_ {
        self.warnings.iter().filter_map(|warning| match warning {
            Error::MissingField { record, .. } => Some(*record),
            _ => None,
        })
    }

    /// (target, field) pairs that were set to the no-data marker.
    pub fn undefined(&self) -> impl Iterator<Item = (TargetId, &str)> + '_ {
        self.warnings.iter().filter_map(|warning| match warning {
            Error::UndefinedNormalization { target, field, .. } => Some((*target, field.as_str())),
            _ => None,
        })
    }

    /// Order skipped-record warnings by record; parallel accumulation collects them unordered.
    pub(crate) fn sort_skipped(&mut self) {
        self.warnings.sort_by_key(|warning| match warning {
            Error::MissingField { record, .. } => *record,
            _ => usize::MAX,
        });
    }
}
