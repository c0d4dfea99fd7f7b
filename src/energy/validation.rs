// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Consistency checks for the energy cache.
//!
//! These are programming-error checks, not part of the production error path.
//! `assert_valid()` runs after every edit when `validate_after_edit` is set,
//! which is the default for debug-assertion builds and for builds with the
//! `validation` feature.

use super::{CacheState, EnergyCache};
use crate::cache::{IndividualEnergyCache, PairwiseEnergyCache};
use crate::error::{EnergyError, ValidationError};
use crate::mark::Mark;
use crate::statistics::Statistics;

impl<E: Mark, S: ?Sized> EnergyCache<E, S> {
    /// Check every cache's internal invariants and the cross-cache total.
    ///
    /// - the individual cache has one entry per mark and its running total
    ///   matches its entries
    /// - the pairwise cache spans the configuration, has one adjacency entry
    ///   per mark, and its running total matches its entries
    /// - the ledger total equals individual + pairwise + aggregate
    ///
    /// The last check guards the write of the total into the ledger, not the
    /// totals themselves: every cache is trusted to track its own entries.
    /// [`check_drift`](Self::check_drift) compares against a from-scratch
    /// evaluation instead.
    pub fn check_valid(&self) -> Result<(), ValidationError> {
        if self.state != CacheState::Initialized {
            return Err(ValidationError::NotInitialized);
        }
        let tolerances = &self.config.tolerances;
        let cfg = self.ledger.cfg();

        self.individual.check(cfg.len(), tolerances.total_relative)?;
        self.pairwise.check(cfg, tolerances.total_relative)?;

        let breakdown = self.breakdown();
        if !tolerances.total_agrees(breakdown.total, breakdown.sum()) {
            return Err(ValidationError::TotalMismatch {
                total: breakdown.total,
                sum: breakdown.sum(),
            });
        }
        Ok(())
    }

    /// Panic if [`check_valid`](Self::check_valid) fails.
    pub fn assert_valid(&self) {
        if let Err(err) = self.check_valid() {
            panic!("energy cache invariant violated: {}", err);
        }
    }

    /// Total energy of the current configuration computed from scratch,
    /// without touching the caches.
    ///
    /// Useful to bound the drift of the incremental total over a long run.
    pub fn recomputed_total(&self, ctx: &S) -> Result<f64, EnergyError> {
        let marks = self.ledger.cfg().marks();
        let mut scratch = Statistics::new();
        let individual = IndividualEnergyCache::init(marks, &self.scheme, ctx, &mut scratch)?;
        let pairwise = PairwiseEnergyCache::init(marks, &self.scheme, ctx, &mut scratch)?;
        let mut aggregate = self.aggregate;
        let aggregate = aggregate.recompute(marks, &self.scheme, ctx, &mut scratch)?;
        Ok(individual.total() + pairwise.total() + aggregate)
    }

    /// Compare the incremental total against
    /// [`recomputed_total`](Self::recomputed_total) within
    /// `tolerances.total_relative`.
    ///
    /// This catches an evaluator whose result depends on state the caches do
    /// not see, such as a context that changed without an `update_total`.
    pub fn check_drift(&self, ctx: &S) -> Result<(), ValidationError> {
        if self.state != CacheState::Initialized {
            return Err(ValidationError::NotInitialized);
        }
        let recomputed = self
            .recomputed_total(ctx)
            .map_err(ValidationError::Recompute)?;
        let total = self.total();
        if !self.config.tolerances.total_agrees(total, recomputed) {
            return Err(ValidationError::Drift { total, recomputed });
        }
        Ok(())
    }
}
