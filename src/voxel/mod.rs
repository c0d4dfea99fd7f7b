// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The voxelized energy cache: the entry point an optimizer uses.
//!
//! [`VoxelizedEnergyCache`] wraps an [`EnergyCache`] whose elements are
//! [`VoxelizedMark`]s and keeps a [`VoxelMemo`] from mark identity to raster.
//!
//! - `add` / `exchange` rasterize the incoming mark, delegate to the energy
//!   cache, then install the memo entry. An exchange that keeps the identity
//!   of the outgoing mark overwrites its entry.
//! - `remove` / `remove_two` delegate first, then drop the stale memo entries
//!
//! The energy cache itself never allocates rasters.

pub mod memo;

pub use memo::{Rasterizer, VoxelMemo, VoxelizedMark};

use crate::cfg::Configuration;
use crate::config::EnergyCacheConfig;
use crate::energy::{EnergyBreakdown, EnergyCache};
use crate::error::{CacheStage, EnergyError, ValidationError};
use crate::mark::{Mark, MarkId};
use crate::scheme::EnergyScheme;
use crate::statistics::{Counters, Statistics};
use crate::trail::{Snapshot, SnapshotTrail};
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;

/// Energy scheme over voxelized marks.
pub type VoxelizedScheme<M, R, S> = EnergyScheme<VoxelizedMark<M, R>, S>;

/// An energy cache plus the voxelization memo for its marks.
pub struct VoxelizedEnergyCache<M, R, S: ?Sized> {
    cache: EnergyCache<VoxelizedMark<M, R>, S>,
    memo: VoxelMemo<R>,
    rasterizer: Arc<dyn Rasterizer<M, R>>,
}

impl<M: Mark, R, S: ?Sized> VoxelizedEnergyCache<M, R, S> {
    /// Rasterize the seed `marks` and wrap them in an uninitialized cache.
    /// Call [`init`](Self::init) before any edit.
    pub fn new(
        marks: Vec<M>,
        rasterizer: Arc<dyn Rasterizer<M, R>>,
        scheme: Arc<VoxelizedScheme<M, R, S>>,
        config: EnergyCacheConfig,
    ) -> Result<Self, EnergyError> {
        let mut memo = VoxelMemo::new();
        let mut stats = Statistics::new();
        let mut elements = Vec::with_capacity(marks.len());
        for mark in marks {
            let raster = rasterize(rasterizer.as_ref(), &mark, &mut stats)?;
            memo.insert(mark.id(), Arc::clone(&raster));
            elements.push(VoxelizedMark::new(mark, raster));
        }

        let mut cache = EnergyCache::new(Configuration::from_marks(elements), scheme, config);
        cache.statistics_mut().merge(&stats);
        Ok(Self {
            cache,
            memo,
            rasterizer,
        })
    }

    /// Build the energy caches. See [`EnergyCache::init`].
    pub fn init(&mut self, ctx: &S) -> Result<(), EnergyError> {
        self.cache.init(ctx)
    }

    /// Append `mark`.
    pub fn add(&mut self, mark: M, ctx: &S) -> Result<(), EnergyError> {
        self.cache.check_ready()?;
        let id = mark.id();
        let raster = self.voxelize(&mark)?;
        self.cache
            .add(VoxelizedMark::new(mark, Arc::clone(&raster)), ctx)?;
        self.memo.insert(id, raster);
        self.after_edit();
        Ok(())
    }

    /// Remove the mark at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn remove(&mut self, index: usize, ctx: &S) -> Result<(), EnergyError> {
        let id = self.cache.mark(index).id();
        self.cache.remove(index, ctx)?;
        self.memo.remove(id);
        self.after_edit();
        Ok(())
    }

    /// Remove the marks at two distinct indices of the pre-edit configuration.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range or `i == j`.
    pub fn remove_two(&mut self, i: usize, j: usize, ctx: &S) -> Result<(), EnergyError> {
        let a = self.cache.mark(i).id();
        let b = self.cache.mark(j).id();
        self.cache.remove_two(i, j, ctx)?;
        self.memo.remove(a);
        self.memo.remove(b);
        self.after_edit();
        Ok(())
    }

    /// Replace the mark at `index` with `mark`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn exchange(&mut self, index: usize, mark: M, ctx: &S) -> Result<(), EnergyError> {
        self.cache.check_ready()?;
        let old = self.cache.mark(index).id();
        let id = mark.id();
        let raster = self.voxelize(&mark)?;
        self.cache
            .exchange(index, VoxelizedMark::new(mark, Arc::clone(&raster)), ctx)?;
        if old != id {
            self.memo.remove(old);
        }
        self.memo.insert(id, raster);
        self.after_edit();
        Ok(())
    }

    /// See [`EnergyCache::update_total`].
    pub fn update_total(&mut self, ctx: &S) -> Result<f64, EnergyError> {
        self.cache.update_total(ctx)
    }

    pub fn total(&self) -> f64 {
        self.cache.total()
    }

    pub fn breakdown(&self) -> EnergyBreakdown {
        self.cache.breakdown()
    }

    /// The mark at `index`.
    pub fn mark(&self, index: usize) -> &M {
        self.cache.mark(index).mark()
    }

    /// The memoized raster of mark `id`, if it is live.
    pub fn voxelization(&self, id: MarkId) -> Option<&Arc<R>> {
        self.memo.get(id)
    }

    pub fn memo(&self) -> &VoxelMemo<R> {
        &self.memo
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// The wrapped energy cache, for per-entry queries.
    pub fn energy_cache(&self) -> &EnergyCache<VoxelizedMark<M, R>, S> {
        &self.cache
    }

    pub fn statistics(&self) -> &Statistics {
        self.cache.statistics()
    }

    /// An empty snapshot trail sized by the cache's `max_trail_depth`.
    pub fn trail(&self) -> SnapshotTrail<Self> {
        SnapshotTrail::with_max_depth(self.cache.config().max_trail_depth)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn is_usable(&self) -> bool {
        self.cache.is_usable()
    }

    pub fn is_configuration_span(&self) -> bool {
        self.cache.is_configuration_span()
    }

    /// The energy cache checks, plus one memo entry per live mark and none for
    /// marks that are gone.
    pub fn check_valid(&self) -> Result<(), ValidationError> {
        self.cache.check_valid()?;

        let live: FxHashSet<MarkId> = self.cache.configuration().ids().collect();
        if let Some(mark) = live.iter().copied().find(|&id| !self.memo.contains(id)) {
            return Err(ValidationError::MissingVoxelization { mark });
        }
        if let Some(mark) = self.memo.ids().find(|id| !live.contains(id)) {
            return Err(ValidationError::StaleVoxelization { mark });
        }
        Ok(())
    }

    /// Panic if [`check_valid`](Self::check_valid) fails.
    pub fn assert_valid(&self) {
        if let Err(err) = self.check_valid() {
            panic!("voxelized energy cache invariant violated: {}", err);
        }
    }

    fn after_edit(&self) {
        if self.cache.config().validate_after_edit {
            self.assert_valid();
        }
    }

    /// A fresh raster for `mark`. The memo is never consulted: a mark may keep
    /// its identity across an exchange and still change its geometry.
    ///
    /// A rasterizer failure poisons the instance like any other evaluation
    /// failure.
    fn voxelize(&mut self, mark: &M) -> Result<Arc<R>, EnergyError> {
        let result = rasterize(self.rasterizer.as_ref(), mark, self.cache.statistics_mut());
        if let Err(err) = &result {
            self.cache.poison("voxelize", err);
        }
        result
    }
}

impl<M: Mark, R, S: ?Sized> Snapshot for VoxelizedEnergyCache<M, R, S> {
    fn shallow_copy(&self) -> Self {
        Self {
            cache: self.cache.shallow_copy(),
            memo: self.memo.clone(),
            rasterizer: Arc::clone(&self.rasterizer),
        }
    }

    fn deep_copy(&self) -> Self {
        Self {
            cache: self.cache.deep_copy(),
            memo: self.memo.detached(),
            rasterizer: Arc::clone(&self.rasterizer),
        }
    }
}

impl<M: Mark, R, S: ?Sized> fmt::Debug for VoxelizedEnergyCache<M, R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoxelizedEnergyCache")
            .field("cache", &self.cache)
            .field("memo", &self.memo)
            .finish()
    }
}

fn rasterize<M: Mark, R>(
    rasterizer: &dyn Rasterizer<M, R>,
    mark: &M,
    stats: &mut Statistics,
) -> Result<Arc<R>, EnergyError> {
    stats.increment_counter(Counters::VoxelizationsComputed);
    rasterizer
        .rasterize(mark)
        .map(Arc::new)
        .map_err(|source| EnergyError::evaluation(CacheStage::Voxelization, mark.id(), source))
}
