// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The total-energy ledger.
//!
//! Couples a configuration with the last known total energy. The caches that
//! produced the total are derived state: they are not part of the ledger and
//! are rebuilt from it with `EnergyCache::from_ledger` followed by `init()`.

use super::Configuration;
use crate::mark::Mark;
use crate::trail::Snapshot;
use serde::{Deserialize, Serialize};

/// A configuration and its last computed total energy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationWithTotal<E> {
    cfg: Configuration<E>,
    total: f64,
}

impl<E: Mark> ConfigurationWithTotal<E> {
    /// Create a ledger over `cfg` with the total unset (zero).
    pub fn new(cfg: Configuration<E>) -> Self {
        Self { cfg, total: 0.0 }
    }

    pub fn cfg(&self) -> &Configuration<E> {
        &self.cfg
    }

    pub(crate) fn cfg_mut(&mut self) -> &mut Configuration<E> {
        &mut self.cfg
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub(crate) fn set_total(&mut self, total: f64) {
        self.total = total;
    }

    /// Split the ledger back into its parts.
    pub fn into_parts(self) -> (Configuration<E>, f64) {
        (self.cfg, self.total)
    }
}

impl<E: Mark> Snapshot for ConfigurationWithTotal<E> {
    fn shallow_copy(&self) -> Self {
        Self {
            cfg: self.cfg.shallow_copy(),
            total: self.total,
        }
    }

    fn deep_copy(&self) -> Self {
        Self {
            cfg: self.cfg.deep_copy(),
            total: self.total,
        }
    }
}
