// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Common test utilities shared across integration tests.
//!
//! The model is one-dimensional: a mark is an interval `[centre - radius,
//! centre + radius]` with a fixed individual energy. Two marks interact when
//! their intervals overlap, with edge energy equal to the overlap length.

#![allow(dead_code)]

use mpp_energy::cfg::Configuration;
use mpp_energy::config::EnergyCacheConfig;
use mpp_energy::energy::EnergyCache;
use mpp_energy::error::EvaluationError;
use mpp_energy::mark::{Mark, MarkId};
use mpp_energy::scheme::{
    AggregateEnergy, EnergyScheme, EnergySchemeBuilder, IndividualEnergy, PairEnergy,
};
use mpp_energy::voxel::{Rasterizer, VoxelizedMark};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An interval mark on the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub id: u64,
    pub centre: f64,
    pub radius: f64,
    pub weight: f64,
}

impl Interval {
    pub fn new(id: u64, centre: f64, radius: f64, weight: f64) -> Self {
        Self {
            id,
            centre,
            radius,
            weight,
        }
    }

    /// Length of the overlap with `other`, if positive.
    pub fn overlap(&self, other: &Interval) -> Option<f64> {
        let reach = self.radius + other.radius;
        let distance = (self.centre - other.centre).abs();
        (distance < reach).then_some(reach - distance)
    }
}

impl Mark for Interval {
    fn id(&self) -> MarkId {
        MarkId::new(self.id)
    }
}

/// Context handed to every evaluator.
#[derive(Debug, Clone, Copy)]
pub struct Scene {
    /// Cost per mark of the aggregate term
    pub density: f64,
    /// Marks with this id make the pair predicate fail
    pub poison: Option<u64>,
}

impl Scene {
    pub fn new(density: f64) -> Self {
        Self {
            density,
            poison: None,
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(0.5)
    }
}

pub struct Weight;

impl IndividualEnergy<Interval, Scene> for Weight {
    fn energy(&self, mark: &Interval, _: &Scene) -> Result<f64, EvaluationError> {
        Ok(mark.weight)
    }
}

/// Overlapping intervals interact with energy equal to the overlap length.
pub struct Overlap;

impl PairEnergy<Interval, Scene> for Overlap {
    fn interaction(
        &self,
        a: &Interval,
        b: &Interval,
        scene: &Scene,
    ) -> Result<Option<f64>, EvaluationError> {
        if let Some(poison) = scene.poison {
            if a.id == poison || b.id == poison {
                return Err(EvaluationError::new(format!(
                    "geometry of mark {} is degenerate",
                    poison
                )));
            }
        }
        Ok(a.overlap(b))
    }
}

/// `density` per mark.
pub struct Density;

impl AggregateEnergy<Interval, Scene> for Density {
    fn energy(&self, marks: &[Interval], scene: &Scene) -> Result<f64, EvaluationError> {
        Ok(scene.density * marks.len() as f64)
    }
}

pub fn interval_scheme() -> Arc<EnergyScheme<Interval, Scene>> {
    EnergySchemeBuilder::new(Weight)
        .pair(Overlap)
        .aggregate(Density)
        .build()
}

pub fn checked_config() -> EnergyCacheConfig {
    EnergyCacheConfig {
        validate_after_edit: true,
        ..EnergyCacheConfig::default()
    }
}

/// An initialized cache over `marks`.
pub fn interval_cache(marks: Vec<Interval>, scene: &Scene) -> EnergyCache<Interval, Scene> {
    let mut cache = EnergyCache::new(
        Configuration::from_marks(marks),
        interval_scheme(),
        checked_config(),
    );
    cache.init(scene).unwrap();
    cache
}

/// Brute-force total of `marks`, independent of the caches.
pub fn brute_force_total(marks: &[Interval], scene: &Scene) -> f64 {
    let individual: f64 = marks.iter().map(|m| m.weight).sum();
    let mut pairwise = 0.0;
    for (i, a) in marks.iter().enumerate() {
        for b in &marks[i + 1..] {
            pairwise += a.overlap(b).unwrap_or(0.0);
        }
    }
    individual + pairwise + scene.density * marks.len() as f64
}

/// The integer cells `[lo, hi]` an interval covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cells {
    pub lo: i64,
    pub hi: i64,
}

impl Cells {
    pub fn count(&self) -> i64 {
        self.hi - self.lo + 1
    }

    pub fn shared_with(&self, other: &Cells) -> i64 {
        (self.hi.min(other.hi) - self.lo.max(other.lo) + 1).max(0)
    }
}

/// Rasterizes intervals onto unit cells; rejects non-positive radii.
pub struct CellRasterizer;

impl Rasterizer<Interval, Cells> for CellRasterizer {
    fn rasterize(&self, mark: &Interval) -> Result<Cells, EvaluationError> {
        if mark.radius <= 0.0 {
            return Err(EvaluationError::new("cannot rasterize an empty interval"));
        }
        Ok(Cells {
            lo: (mark.centre - mark.radius).floor() as i64,
            hi: (mark.centre + mark.radius).floor() as i64,
        })
    }
}

pub type Voxelized = VoxelizedMark<Interval, Cells>;

/// One unit of energy per covered cell.
pub struct CellCount;

impl IndividualEnergy<Voxelized, Scene> for CellCount {
    fn energy(&self, mark: &Voxelized, _: &Scene) -> Result<f64, EvaluationError> {
        Ok(mark.raster().count() as f64)
    }
}

/// Marks sharing cells interact with one unit per shared cell.
pub struct SharedCells;

impl PairEnergy<Voxelized, Scene> for SharedCells {
    fn interaction(
        &self,
        a: &Voxelized,
        b: &Voxelized,
        _: &Scene,
    ) -> Result<Option<f64>, EvaluationError> {
        let shared = a.raster().shared_with(b.raster());
        Ok((shared > 0).then_some(shared as f64))
    }
}

pub fn cell_scheme() -> Arc<EnergyScheme<Voxelized, Scene>> {
    EnergySchemeBuilder::new(CellCount).pair(SharedCells).build()
}
