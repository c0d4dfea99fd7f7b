// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Individual-energy cache: one cached scalar per mark index.
//!
//! Entries are kept in configuration order, so entry `i` belongs to the mark
//! at index `i`. An entry is evaluated once when its mark arrives and never
//! again until that mark is exchanged away.

use crate::error::{CacheStage, EnergyError, ValidationError};
use crate::mark::Mark;
use crate::scheme::EnergyScheme;
use crate::statistics::{Counters, Statistics};
use crate::trail::Snapshot;
use std::sync::Arc;

/// Cached per-mark energies with a running total.
#[derive(Debug, Clone, Default)]
pub struct IndividualEnergyCache {
    /// Energy of the mark at each index (copy-on-write)
    energies: Arc<Vec<f64>>,
    /// Running sum of `energies`
    total: f64,
}

impl IndividualEnergyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the cache by evaluating every mark once.
    pub fn init<E: Mark, S: ?Sized>(
        marks: &[E],
        scheme: &EnergyScheme<E, S>,
        ctx: &S,
        stats: &mut Statistics,
    ) -> Result<Self, EnergyError> {
        let energies = marks
            .iter()
            .map(|mark| evaluate(mark, scheme, ctx, stats))
            .collect::<Result<Vec<_>, _>>()?;
        let total = energies.iter().sum();
        Ok(Self {
            energies: Arc::new(energies),
            total,
        })
    }

    /// Evaluate `mark` and append its entry. Returns the mark's energy.
    pub fn add<E: Mark, S: ?Sized>(
        &mut self,
        mark: &E,
        scheme: &EnergyScheme<E, S>,
        ctx: &S,
        stats: &mut Statistics,
    ) -> Result<f64, EnergyError> {
        let energy = evaluate(mark, scheme, ctx, stats)?;
        Arc::make_mut(&mut self.energies).push(energy);
        self.total += energy;
        Ok(energy)
    }

    /// Delete the entry at `index`, returning its energy.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn remove(&mut self, index: usize) -> f64 {
        self.check_index(index);
        let energy = Arc::make_mut(&mut self.energies).remove(index);
        self.total -= energy;
        energy
    }

    /// Delete the entries at two distinct pre-edit indices.
    pub fn remove_two(&mut self, i: usize, j: usize) -> (f64, f64) {
        if i > j {
            let at_i = self.remove(i);
            (at_i, self.remove(j))
        } else {
            let at_j = self.remove(j);
            (self.remove(i), at_j)
        }
    }

    /// Re-evaluate the entry at `index` for `mark`, touching no other entry.
    ///
    /// Returns the new energy. On failure the entry is left unchanged.
    pub fn exchange_at<E: Mark, S: ?Sized>(
        &mut self,
        index: usize,
        mark: &E,
        scheme: &EnergyScheme<E, S>,
        ctx: &S,
        stats: &mut Statistics,
    ) -> Result<f64, EnergyError> {
        self.check_index(index);
        let energy = evaluate(mark, scheme, ctx, stats)?;
        let old = std::mem::replace(&mut Arc::make_mut(&mut self.energies)[index], energy);
        self.total += energy - old;
        Ok(energy)
    }

    /// Cached energy of the mark at `index`.
    pub fn get(&self, index: usize) -> f64 {
        self.check_index(index);
        self.energies[index]
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Check entry count against the configuration and the running total
    /// against a fresh sum.
    pub fn check(&self, marks: usize, tolerance: f64) -> Result<(), ValidationError> {
        if self.energies.len() != marks {
            return Err(ValidationError::IndividualCount {
                entries: self.energies.len(),
                marks,
            });
        }
        let summed: f64 = self.energies.iter().sum();
        if (summed - self.total).abs() > tolerance * summed.abs().max(1.0) {
            return Err(ValidationError::IndividualDrift {
                running: self.total,
                summed,
            });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.energies.len(),
            "index {} out of range for individual cache of {} entries",
            index,
            self.energies.len()
        );
    }
}

impl Snapshot for IndividualEnergyCache {
    fn shallow_copy(&self) -> Self {
        self.clone()
    }

    fn deep_copy(&self) -> Self {
        Self {
            energies: Arc::new(self.energies.as_ref().clone()),
            total: self.total,
        }
    }
}

fn evaluate<E: Mark, S: ?Sized>(
    mark: &E,
    scheme: &EnergyScheme<E, S>,
    ctx: &S,
    stats: &mut Statistics,
) -> Result<f64, EnergyError> {
    stats.increment_counter(Counters::IndividualEvaluations);
    scheme
        .individual()
        .energy(mark, ctx)
        .map_err(|source| EnergyError::evaluation(CacheStage::Individual, mark.id(), source))
}
