//! Run configuration.
//!
//! Precedence, highest first: command-line flags (applied by the CLI), a JSON config file,
//! then the defaults below.
//!
//! ```json
//! {
//!   "weights": { "TotalPM25": "TotalPop" },
//!   "mode": "denominator-weighted-no-area",
//!   "on_missing": "skip",
//!   "no_data": -9999.0,
//!   "parallel": true,
//!   "projection": { "source": "...", "target": "...", "working": "...", "working_prj": "PROJCS[...]" }
//! }
//! ```

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geom::Reprojector;
use crate::interp::{InterpolationOptions, MissingFieldPolicy, DEFAULT_NO_DATA};
use crate::layer::{normalize_field_name, FieldSchema};
use crate::weight::{IntensiveMode, WeightingPolicy};

/// PROJ.4 strings describing the input layers and the planar system to interpolate in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionConfig {
    pub source: Option<String>,
    pub target: Option<String>,
    /// Defaults to `target` when both layer systems are given.
    pub working: Option<String>,
    /// `.prj` (WKT) text of the working system, written next to reprojected output. Known for
    /// the InMAP grid without being set.
    pub working_prj: Option<String>,
}

/// Reprojectors into the working system; `None` means the layer is already there.
#[derive(Debug, Default)]
pub struct LayerReprojectors {
    pub source: Option<Reprojector>,
    pub target: Option<Reprojector>,
}

impl ProjectionConfig {
    /// Resolve which layers need reprojecting.
    pub fn reprojectors(&self) -> Result<LayerReprojectors> {
        let (source, target) = match (&self.source, &self.target, &self.working) {
            (None, None, None) => return Ok(LayerReprojectors::default()),
            (Some(source), Some(target), _) => (source, target),
            _ => return Err(Error::config(
                "projection needs both `source` and `target` systems when any system is given",
            )),
        };
        let working = self.working.as_deref().unwrap_or(target.as_str());

        let build = |from: &str| -> Result<Option<Reprojector>> {
            if from.trim() == working.trim() {
                return Ok(None);
            }
            let reprojector = Reprojector::new(from, working)?;
            Ok(Some(match &self.working_prj {
                Some(wkt) => reprojector.with_target_prj(wkt.as_str()),
                None => reprojector,
            }))
        };

        Ok(LayerReprojectors { source: build(source.as_str())?, target: build(target.as_str())? })
    }
}

/// Complete configuration of one interpolation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Weighted-average field → denominator field, keyed by normalized name once loaded.
    pub weights: BTreeMap<String, String>,
    pub mode: IntensiveMode,
    pub on_missing: MissingFieldPolicy,
    /// Written into weighted fields whose denominator accumulated to zero.
    pub no_data: f64,
    pub parallel: bool,
    pub projection: ProjectionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            mode: IntensiveMode::default(),
            on_missing: MissingFieldPolicy::default(),
            no_data: DEFAULT_NO_DATA,
            parallel: false,
            projection: ProjectionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from JSON text; missing keys take their defaults.
    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(content)?;
        config.normalize_weights()?;
        config.validate()?;
        Ok(config)
    }

    /// Re-key `weights` by normalized name; spellings of one field must agree.
    fn normalize_weights(&mut self) -> Result<()> {
        let mut normalized = BTreeMap::new();
        for (field, denominator) in std::mem::take(&mut self.weights) {
            let (field, denominator) = (normalize_field_name(&field), normalize_field_name(&denominator));
            if let Some(previous) = normalized.insert(field.clone(), denominator.clone()) {
                if previous != denominator {
                    return Err(Error::config(format!(
                        "weights list {field:?} twice, with {previous:?} and {denominator:?}"
                    )));
                }
            }
        }
        self.weights = normalized;
        Ok(())
    }

    /// Set the denominator of a weighted field, replacing any entry for another spelling of it.
    pub fn set_weight(&mut self, field: &str, denominator: &str) {
        let field = normalize_field_name(field);
        self.weights.retain(|existing, _| normalize_field_name(existing) != field);
        self.weights.insert(field, normalize_field_name(denominator));
    }

    /// Parse a `FIELD=DENOMINATOR` pair as given on the command line.
    pub fn parse_weight(pair: &str) -> Result<(String, String)> {
        match pair.split_once('=') {
            Some((field, denominator)) if !field.trim().is_empty() && !denominator.trim().is_empty() => {
                Ok((field.trim().to_string(), denominator.trim().to_string()))
            }
            _ => Err(Error::config(format!("expected FIELD=DENOMINATOR, got {pair:?}"))),
        }
    }

    /// Check settings that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if !self.no_data.is_finite() {
            return Err(Error::config(format!("no_data must be finite, got {}", self.no_data)));
        }
        self.projection.reprojectors().map(|_| ())
    }

    /// Build the weighting policy and check it against the source schema.
    pub fn policy(&self, schema: &FieldSchema) -> Result<WeightingPolicy> {
        let policy = WeightingPolicy::new(&self.weights, self.mode)?;
        policy.validate(schema)?;
        Ok(policy)
    }

    pub fn options(&self) -> InterpolationOptions {
        InterpolationOptions { on_missing: self.on_missing, no_data: self.no_data, parallel: self.parallel }
    }
}
