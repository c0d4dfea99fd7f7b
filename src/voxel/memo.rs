// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Voxelization memo: each live mark's rasterized form.
//!
//! Rasters are immutable once created and are shared by `Arc`, so any number
//! of cache copies may hold the same raster. Copying the memo copies only the
//! index from mark identity to raster. A writer always installs a new entry
//! rather than mutating a raster in place.

use crate::error::EvaluationError;
use crate::mark::{Mark, MarkId};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Produces the rasterized form of a mark.
pub trait Rasterizer<M, R> {
    fn rasterize(&self, mark: &M) -> Result<R, EvaluationError>;
}

/// A mark paired with its rasterized form.
///
/// This is the element the energy evaluators see behind a
/// `VoxelizedEnergyCache`, so no evaluator ever re-rasterizes a mark.
pub struct VoxelizedMark<M, R> {
    mark: M,
    raster: Arc<R>,
}

impl<M, R> VoxelizedMark<M, R> {
    pub fn new(mark: M, raster: Arc<R>) -> Self {
        Self { mark, raster }
    }

    pub fn mark(&self) -> &M {
        &self.mark
    }

    pub fn raster(&self) -> &R {
        &self.raster
    }

    pub fn raster_handle(&self) -> &Arc<R> {
        &self.raster
    }
}

impl<M: Clone, R> Clone for VoxelizedMark<M, R> {
    fn clone(&self) -> Self {
        Self {
            mark: self.mark.clone(),
            raster: Arc::clone(&self.raster),
        }
    }
}

impl<M: fmt::Debug, R> fmt::Debug for VoxelizedMark<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoxelizedMark")
            .field("mark", &self.mark)
            .finish_non_exhaustive()
    }
}

impl<M: Mark, R> Mark for VoxelizedMark<M, R> {
    fn id(&self) -> MarkId {
        self.mark.id()
    }
}

/// Index from mark identity to raster, copy-on-write.
pub struct VoxelMemo<R> {
    entries: Arc<FxHashMap<MarkId, Arc<R>>>,
}

impl<R> VoxelMemo<R> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(FxHashMap::default()),
        }
    }

    pub fn get(&self, id: MarkId) -> Option<&Arc<R>> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: MarkId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Install `raster` for `id`, replacing any earlier entry.
    pub fn insert(&mut self, id: MarkId, raster: Arc<R>) {
        Arc::make_mut(&mut self.entries).insert(id, raster);
    }

    pub fn remove(&mut self, id: MarkId) -> Option<Arc<R>> {
        Arc::make_mut(&mut self.entries).remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = MarkId> + '_ {
        self.entries.keys().copied()
    }

    /// Copy of the index that does not share it; rasters are still shared.
    pub fn detached(&self) -> Self {
        Self {
            entries: Arc::new(self.entries.as_ref().clone()),
        }
    }
}

impl<R> Clone for VoxelMemo<R> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<R> Default for VoxelMemo<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for VoxelMemo<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoxelMemo")
            .field("entries", &self.entries.len())
            .finish()
    }
}
