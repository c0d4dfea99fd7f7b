// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Aggregate-energy cache.
//!
//! Aggregate terms (density, global shape priors) are defined over collective
//! statistics of the whole configuration and have no natural incremental
//! decomposition. The cache therefore holds only the last value and is
//! recomputed wholesale on every total refresh.

use crate::error::{CacheStage, EnergyError};
use crate::mark::{Mark, MarkId};
use crate::scheme::EnergyScheme;
use crate::statistics::{Counters, Statistics};

/// The last computed aggregate energy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateEnergyCache {
    value: f64,
}

impl AggregateEnergyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the aggregate term over all of `marks` and return it.
    ///
    /// A scheme without an aggregate term contributes zero.
    pub fn recompute<E: Mark, S: ?Sized>(
        &mut self,
        marks: &[E],
        scheme: &EnergyScheme<E, S>,
        ctx: &S,
        stats: &mut Statistics,
    ) -> Result<f64, EnergyError> {
        let Some(aggregate) = scheme.aggregate() else {
            self.value = 0.0;
            return Ok(0.0);
        };
        stats.increment_counter(Counters::AggregateRecomputes);
        // No single mark is at fault; report the most recent one
        let culprit = marks.last().map(Mark::id).unwrap_or(MarkId::new(0));
        self.value = aggregate
            .energy(marks, ctx)
            .map_err(|source| EnergyError::evaluation(CacheStage::Aggregate, culprit, source))?;
        Ok(self.value)
    }

    pub fn total(&self) -> f64 {
        self.value
    }
}
