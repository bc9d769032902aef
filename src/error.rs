//! Error types for the interpolation core.
//!
//! File I/O and the CLI work in `anyhow::Result`; everything the engine can report about the
//! data itself is a variant here, so callers can match on it.

use thiserror::Error;

use crate::layer::TargetId;

/// The main error type for reagg operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A source polygon has zero, negative or non-finite area.
    #[error("degenerate geometry: source record {record} has area {area}")]
    DegenerateGeometry { record: usize, area: f64 },

    /// A source record lacks a field referenced by the weighting policy.
    #[error("missing field: source record {record} has no value for {field:?}")]
    MissingField { record: usize, field: String },

    /// A target's denominator accumulated to zero, so its weighted average is undefined.
    #[error("undefined normalization: {target} has zero {denominator:?}, {field:?} set to no-data")]
    UndefinedNormalization { target: TargetId, field: String, denominator: String },

    /// The weighting policy is inconsistent with itself or with the source schema.
    #[error("invalid weighting policy: {message}")]
    InvalidWeightingPolicy { message: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Config { message: String },

    /// PROJ.4 parse or transform failures
    #[error("projection error: {message}")]
    Projection { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn policy(message: impl Into<String>) -> Self {
        Self::InvalidWeightingPolicy { message: message.into() }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// True for per-record conditions that a run may record and continue past.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingField { .. } | Self::UndefinedNormalization { .. })
    }
}
