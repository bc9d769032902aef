use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layer::{normalize_field_name, FieldSchema};

/// How intensive (weighted-average) fields are accumulated before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntensiveMode {
    /// `t[k] += v * r[w]`: every overlapping target receives the source's full
    /// denominator-weighted value, regardless of how much of the source it covers.
    #[default]
    DenominatorWeightedNoArea,
    /// `t[k] += v * r[w] * A_isect / rArea`: the weight is apportioned by overlap exactly like
    /// the denominator itself, giving an area-and-denominator weighted mean.
    AreaWeighted,
}

impl IntensiveMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DenominatorWeightedNoArea => "denominator-weighted-no-area",
            Self::AreaWeighted => "area-weighted",
        }
    }
}

impl fmt::Display for IntensiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for IntensiveMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "denominator-weighted-no-area" => Ok(Self::DenominatorWeightedNoArea),
            "area-weighted" => Ok(Self::AreaWeighted),
            other => Err(format!(
                "unknown intensive mode {other:?} (expected area-weighted or denominator-weighted-no-area)"
            )),
        }
    }
}

/// Maps weighted-average fields to the denominator field their mean is taken over.
///
/// Every field not named as a key is extensive. Construction guarantees that no denominator is
/// itself a weighted field; [`WeightingPolicy::validate`] additionally checks the names against
/// a source schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeightingPolicy {
    weights: BTreeMap<String, String>,
    mode: IntensiveMode,
}

impl WeightingPolicy {
    /// A policy with no weighted fields: everything is distributed by area.
    pub fn extensive() -> Self { Self::default() }

    /// Build a policy from `(weighted field, denominator field)` pairs. Names are normalized.
    pub fn new<I, K, V>(weights: I, mode: IntensiveMode) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = BTreeMap::new();
        for (field, denominator) in weights {
            let field = normalize_field_name(field.as_ref());
            let denominator = normalize_field_name(denominator.as_ref());
            if field.is_empty() || denominator.is_empty() {
                return Err(Error::policy("field and denominator names must be non-empty"));
            }
            if let Some(previous) = map.get(&field) {
                if previous != &denominator {
                    return Err(Error::policy(format!(
                        "{field:?} is weighted by both {previous:?} and {denominator:?}"
                    )));
                }
            }
            map.insert(field, denominator);
        }

        for (field, denominator) in &map {
            if map.contains_key(denominator) {
                return Err(Error::policy(format!(
                    "denominator {denominator:?} of {field:?} is itself a weighted-average field"
                )));
            }
        }

        Ok(Self { weights: map, mode })
    }

    /// Check that every weighted field and every denominator exists in `schema`.
    pub fn validate(&self, schema: &FieldSchema) -> Result<()> {
        for (field, denominator) in &self.weights {
            if !schema.contains_normalized(field) {
                return Err(Error::policy(format!("weighted field {field:?} is not in the source schema")));
            }
            if !schema.contains_normalized(denominator) {
                return Err(Error::policy(format!(
                    "denominator {denominator:?} of {field:?} is not in the source schema"
                )));
            }
        }
        Ok(())
    }

    #[inline] pub fn mode(&self) -> IntensiveMode { self.mode }

    #[inline] pub fn is_empty(&self) -> bool { self.weights.is_empty() }

    /// Denominator of an already-normalized field name, None for extensive fields.
    #[inline]
    pub fn denominator(&self, field: &str) -> Option<&str> {
        self.weights.get(field).map(String::as_str)
    }

    /// Iterate over (weighted field, denominator) pairs.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.weights.iter().map(|(k, w)| (k.as_str(), w.as_str()))
    }
}
