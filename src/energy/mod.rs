// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The energy cache orchestrator.
//!
//! [`EnergyCache`] owns a ledger (configuration plus total) and one instance of
//! each cache, and is the only way to edit them. Every edit sequences the
//! caches in a fixed order and then refreshes the total, so that after each
//! successful edit
//!
//! ```text
//! total == individual.total() + pairwise.total() + aggregate.total()
//! ```
//!
//! holds to floating-point tolerance.
//!
//! # Edit Order
//!
//! - `add`: configuration, individual, pairwise, then refresh
//! - `remove` / `remove_two`: pairwise first (it needs the pre-edit marks),
//!   then individual, then configuration, then refresh
//! - `exchange`: configuration, individual at the index, pairwise (drop old
//!   edges, wire new ones), then refresh
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --init()--> Initialized --edit--> Initialized
//!                                 |
//!                                 +--failed edit--> Failed (poisoned)
//! ```
//!
//! A failed edit leaves the caches in whatever partial state the failing step
//! produced. The instance is poisoned and every later edit returns
//! [`EnergyError::Unusable`]. Recover by discarding it in favour of a snapshot
//! taken before the edit (see [`crate::trail::SnapshotTrail`]).

pub mod breakdown;
pub mod validation;

pub use breakdown::EnergyBreakdown;

use crate::cache::{AggregateEnergyCache, IndividualEnergyCache, PairKey, PairwiseEnergyCache};
use crate::cfg::{Configuration, ConfigurationWithTotal};
use crate::config::EnergyCacheConfig;
use crate::error::EnergyError;
use crate::mark::{Mark, MarkId};
use crate::scheme::EnergyScheme;
use crate::statistics::{Counters, Statistics};
use crate::trail::{Snapshot, SnapshotTrail};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheState {
    Uninitialized,
    Initialized,
    Failed,
}

/// Incrementally maintained total energy of a configuration.
///
/// `E` is the configuration element (a mark, or a mark with its voxelization)
/// and `S` the context handed to every evaluator.
pub struct EnergyCache<E, S: ?Sized> {
    /// Configuration and last computed total
    ledger: ConfigurationWithTotal<E>,
    individual: IndividualEnergyCache,
    pairwise: PairwiseEnergyCache,
    aggregate: AggregateEnergyCache,
    /// Evaluators, shared by all copies
    scheme: Arc<EnergyScheme<E, S>>,
    config: EnergyCacheConfig,
    statistics: Statistics,
    state: CacheState,
}

impl<E: Mark, S: ?Sized> EnergyCache<E, S> {
    /// Create an uninitialized cache over `cfg`. Call [`init`](Self::init)
    /// before any edit.
    pub fn new(
        cfg: Configuration<E>,
        scheme: Arc<EnergyScheme<E, S>>,
        config: EnergyCacheConfig,
    ) -> Self {
        Self::from_ledger(ConfigurationWithTotal::new(cfg), scheme, config)
    }

    /// Create an uninitialized cache over a saved ledger.
    ///
    /// The caches are derived state; `init()` rebuilds them and replaces the
    /// ledger's total with a freshly computed one.
    pub fn from_ledger(
        ledger: ConfigurationWithTotal<E>,
        scheme: Arc<EnergyScheme<E, S>>,
        config: EnergyCacheConfig,
    ) -> Self {
        Self {
            ledger,
            individual: IndividualEnergyCache::new(),
            pairwise: PairwiseEnergyCache::new(),
            aggregate: AggregateEnergyCache::new(),
            scheme,
            config,
            statistics: Statistics::new(),
            state: CacheState::Uninitialized,
        }
    }

    /// Build all three caches from scratch against the current configuration.
    ///
    /// This is the only place the individual and pairwise caches are computed
    /// in full. Calling it again on an initialized cache rebuilds them.
    pub fn init(&mut self, ctx: &S) -> Result<(), EnergyError> {
        if self.state == CacheState::Failed {
            self.statistics.record_failure(&EnergyError::Unusable);
            return Err(EnergyError::Unusable);
        }
        match self.rebuild(ctx) {
            Ok(()) => {
                self.state = CacheState::Initialized;
                info!(
                    marks = self.len(),
                    pairs = self.pairwise.len(),
                    total = self.total(),
                    "energy cache initialized"
                );
                Ok(())
            }
            Err(err) => {
                self.poison("init", &err);
                Err(err)
            }
        }
    }

    /// Append `mark` to the configuration.
    pub fn add(&mut self, mark: E, ctx: &S) -> Result<(), EnergyError> {
        self.edit("add", ctx, |this| {
            this.ledger.cfg_mut().add(mark);

            let marks = this.ledger.cfg().marks();
            let index = marks.len() - 1;
            let (new, existing) = (&marks[index], &marks[..index]);

            this.individual
                .add(new, &this.scheme, ctx, &mut this.statistics)?;
            this.pairwise
                .add(new, existing, &this.scheme, ctx, &mut this.statistics)?;
            this.statistics.increment_counter(Counters::Adds);
            Ok(())
        })
    }

    /// Remove the mark at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn remove(&mut self, index: usize, ctx: &S) -> Result<(), EnergyError> {
        self.edit("remove", ctx, |this| {
            let id = this.ledger.cfg().get(index).id();

            this.pairwise.remove(id)?;
            this.individual.remove(index);
            this.ledger.cfg_mut().remove(index);
            this.statistics.increment_counter(Counters::Removes);
            Ok(())
        })
    }

    /// Remove the marks at two distinct indices of the pre-edit configuration.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range or `i == j`.
    pub fn remove_two(&mut self, i: usize, j: usize, ctx: &S) -> Result<(), EnergyError> {
        assert_ne!(i, j, "remove_two requires two distinct indices");
        self.edit("remove_two", ctx, |this| {
            let a = this.ledger.cfg().get(i).id();
            let b = this.ledger.cfg().get(j).id();

            this.pairwise.remove(a)?;
            this.pairwise.remove(b)?;
            this.individual.remove_two(i, j);
            this.ledger.cfg_mut().remove_two(i, j);
            this.statistics.increment_counter(Counters::Removes);
            this.statistics.increment_counter(Counters::Removes);
            Ok(())
        })
    }

    /// Replace the mark at `index` with `mark`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn exchange(&mut self, index: usize, mark: E, ctx: &S) -> Result<(), EnergyError> {
        self.edit("exchange", ctx, |this| {
            let old = this.ledger.cfg_mut().exchange(index, mark);

            let marks = this.ledger.cfg().marks();
            let new = &marks[index];
            let others = marks[..index].iter().chain(&marks[index + 1..]);

            this.individual
                .exchange_at(index, new, &this.scheme, ctx, &mut this.statistics)?;
            this.pairwise
                .exchange(old.id(), new, others, &this.scheme, ctx, &mut this.statistics)?;
            this.statistics.increment_counter(Counters::Exchanges);
            Ok(())
        })
    }

    /// Recompute the aggregate term and set the total to the sum of the three
    /// caches. Returns the new total.
    ///
    /// Every edit already ends with this; call it directly when the context
    /// has changed under an unchanged configuration.
    pub fn update_total(&mut self, ctx: &S) -> Result<f64, EnergyError> {
        self.edit("update_total", ctx, |_| Ok(()))?;
        Ok(self.total())
    }

    /// Last computed total energy.
    ///
    /// After a failed edit the value is unspecified.
    pub fn total(&self) -> f64 {
        self.ledger.total()
    }

    /// The cached parts of the total.
    pub fn breakdown(&self) -> EnergyBreakdown {
        EnergyBreakdown {
            individual: self.individual.total(),
            pairwise: self.pairwise.total(),
            aggregate: self.aggregate.total(),
            total: self.total(),
        }
    }

    /// Cached individual energy of the mark at `index`.
    pub fn individual_energy(&self, index: usize) -> f64 {
        self.individual.get(index)
    }

    /// Cached edge energy between `a` and `b`, if they interact.
    pub fn pair_energy(&self, a: MarkId, b: MarkId) -> Option<f64> {
        self.pairwise.get(a, b)
    }

    /// Number of interacting pairs.
    pub fn pair_count(&self) -> usize {
        self.pairwise.len()
    }

    /// Marks interacting with `id`.
    pub fn neighbours(&self, id: MarkId) -> &[MarkId] {
        self.pairwise.neighbours(id)
    }

    /// All interacting pairs with their edge energies.
    pub fn pairs(&self) -> impl Iterator<Item = (PairKey, f64)> + '_ {
        self.pairwise.pairs()
    }

    /// Whether every cached pair references live marks.
    pub fn is_configuration_span(&self) -> bool {
        self.pairwise.is_configuration_span(self.ledger.cfg())
    }

    pub fn len(&self) -> usize {
        self.ledger.cfg().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.cfg().is_empty()
    }

    /// The mark at `index`.
    pub fn mark(&self, index: usize) -> &E {
        self.ledger.cfg().get(index)
    }

    pub fn configuration(&self) -> &Configuration<E> {
        self.ledger.cfg()
    }

    pub fn ledger(&self) -> &ConfigurationWithTotal<E> {
        &self.ledger
    }

    pub fn scheme(&self) -> &Arc<EnergyScheme<E, S>> {
        &self.scheme
    }

    pub fn config(&self) -> &EnergyCacheConfig {
        &self.config
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// An empty snapshot trail sized by `config.max_trail_depth`.
    pub fn trail(&self) -> SnapshotTrail<Self> {
        SnapshotTrail::with_max_depth(self.config.max_trail_depth)
    }

    pub fn is_initialized(&self) -> bool {
        self.state == CacheState::Initialized
    }

    /// False once an edit has failed on this instance.
    pub fn is_usable(&self) -> bool {
        self.state != CacheState::Failed
    }

    pub(crate) fn statistics_mut(&mut self) -> &mut Statistics {
        &mut self.statistics
    }

    /// Reject an edit on an instance that is not initialized or has failed.
    ///
    /// Nothing is changed besides the failure counter; in particular
    /// `NotInitialized` does not poison the instance.
    pub(crate) fn check_ready(&mut self) -> Result<(), EnergyError> {
        let err = match self.state {
            CacheState::Initialized => return Ok(()),
            CacheState::Uninitialized => EnergyError::NotInitialized,
            CacheState::Failed => EnergyError::Unusable,
        };
        self.statistics.record_failure(&err);
        Err(err)
    }

    /// Run one edit: check the state, apply `step`, refresh the total, and
    /// poison the instance on failure.
    fn edit<F>(&mut self, op: &'static str, ctx: &S, step: F) -> Result<(), EnergyError>
    where
        F: FnOnce(&mut Self) -> Result<(), EnergyError>,
    {
        self.check_ready()?;

        match step(self).and_then(|()| self.refresh_total(ctx)) {
            Ok(()) => {
                debug!(op, marks = self.len(), total = self.total(), "edit applied");
                if self.config.validate_after_edit {
                    self.assert_valid();
                }
                Ok(())
            }
            Err(err) => {
                self.poison(op, &err);
                Err(err)
            }
        }
    }

    fn rebuild(&mut self, ctx: &S) -> Result<(), EnergyError> {
        let marks = self.ledger.cfg().marks();
        self.individual =
            IndividualEnergyCache::init(marks, &self.scheme, ctx, &mut self.statistics)?;
        self.pairwise = PairwiseEnergyCache::init(marks, &self.scheme, ctx, &mut self.statistics)?;
        self.refresh_total(ctx)
    }

    fn refresh_total(&mut self, ctx: &S) -> Result<(), EnergyError> {
        let aggregate = self.aggregate.recompute(
            self.ledger.cfg().marks(),
            &self.scheme,
            ctx,
            &mut self.statistics,
        )?;
        let total = self.individual.total() + self.pairwise.total() + aggregate;
        self.ledger.set_total(total);
        Ok(())
    }

    pub(crate) fn poison(&mut self, op: &'static str, err: &EnergyError) {
        warn!(op, error = %err, "energy cache edit failed; instance is now unusable");
        self.statistics.record_failure(err);
        self.state = CacheState::Failed;
    }
}

impl<E: Mark, S: ?Sized> Snapshot for EnergyCache<E, S> {
    fn shallow_copy(&self) -> Self {
        Self {
            ledger: self.ledger.shallow_copy(),
            individual: self.individual.shallow_copy(),
            pairwise: self.pairwise.shallow_copy(),
            aggregate: self.aggregate,
            scheme: Arc::clone(&self.scheme),
            config: self.config.clone(),
            statistics: self.statistics.clone(),
            state: self.state,
        }
    }

    fn deep_copy(&self) -> Self {
        Self {
            ledger: self.ledger.deep_copy(),
            individual: self.individual.deep_copy(),
            pairwise: self.pairwise.deep_copy(),
            aggregate: self.aggregate,
            scheme: Arc::clone(&self.scheme),
            config: self.config.clone(),
            statistics: self.statistics.clone(),
            state: self.state,
        }
    }
}

impl<E: Mark, S: ?Sized> fmt::Debug for EnergyCache<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnergyCache")
            .field("marks", &self.len())
            .field("pairs", &self.pairwise.len())
            .field("breakdown", &self.breakdown())
            .field("state", &self.state)
            .finish()
    }
}
