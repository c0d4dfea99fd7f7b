// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Energy cache settings.

use serde::{Deserialize, Serialize};

/// Numeric tolerances for the consistency checks.
///
/// These absorb floating-point drift from long runs of incremental updates to
/// running sums; the model itself is exact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Allowed `|total - (individual + pairwise + aggregate)|`, relative to
    /// `max(1, |total|)`.
    pub total_relative: f64,

    /// Allowed difference between the results of a single exchange and the
    /// equivalent remove-then-add.
    pub exchange: f64,
}

impl Tolerances {
    /// Whether `actual` agrees with `expected` under the relative tolerance.
    pub fn total_agrees(&self, actual: f64, expected: f64) -> bool {
        (actual - expected).abs() <= self.total_relative * expected.abs().max(1.0)
    }

    /// Whether two totals reached by an exchange and by the equivalent
    /// remove-then-add agree.
    pub fn exchange_agrees(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.exchange
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            total_relative: 1e-3,
            exchange: 1e-6,
        }
    }
}

/// Settings for an energy cache instance.
///
/// # Example
///
/// ```
/// use mpp_energy::config::EnergyCacheConfig;
///
/// let config = EnergyCacheConfig::from_json_str(r#"{ "validate_after_edit": true }"#).unwrap();
/// assert!(config.validate_after_edit);
/// assert_eq!(config.tolerances.total_relative, 1e-3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyCacheConfig {
    pub tolerances: Tolerances,

    /// Run the full consistency check after every successful edit.
    ///
    /// Defaults to on for debug-assertion builds and builds with the
    /// `validation` feature, off otherwise.
    pub validate_after_edit: bool,

    /// Maximum depth of a snapshot trail created for this cache.
    pub max_trail_depth: usize,
}

impl EnergyCacheConfig {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for EnergyCacheConfig {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            validate_after_edit: cfg!(energy_validation),
            max_trail_depth: 1024,
        }
    }
}
