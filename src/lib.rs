// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Incremental energy caches for marked point-process configurations.
//!
//! A stochastic optimizer over image segmentations proposes a long sequence of
//! small edits to a configuration of marks (add one, remove one, remove a
//! pair, exchange one) and needs the total energy after each. This crate keeps
//! that total up to date without ever recomputing it in full.
//!
//! # Architecture
//!
//! The implementation uses the same two-tier memory model as a backtracking
//! search context:
//!
//! ## Tier 1: Shared Data (Immutable)
//!
//! Data that never changes during optimization and is shared by all copies:
//! - The [`EnergyScheme`]: individual, pairwise and aggregate evaluators
//! - The rasterizer behind a [`VoxelizedEnergyCache`]
//! - Rasters, once created
//!
//! ## Tier 2: Per-Instance Data (Copy-on-write)
//!
//! State that changes with each edit, owned by one cache instance:
//! - The [`ConfigurationWithTotal`] ledger
//! - The individual, pairwise and aggregate caches
//! - The voxelization memo index
//!
//! Tier 2 data sits behind `Arc`s and is cloned on first write, so a shallow
//! copy of a cache is O(1) and a rejected proposal is rolled back by going
//! back to the copy taken before it ([`SnapshotTrail`]).
//!
//! # Energy Decomposition
//!
//! ```text
//! total = Σ individual(mark)            one entry per mark
//!       + Σ pair(a, b)                  one entry per interacting pair
//!       + aggregate(all marks)          recomputed on every refresh
//! ```
//!
//! Only the aggregate term is ever recomputed in full after `init()`.
//!
//! # Example
//!
//! ```
//! use mpp_energy::cfg::Configuration;
//! use mpp_energy::config::EnergyCacheConfig;
//! use mpp_energy::energy::EnergyCache;
//! use mpp_energy::error::EvaluationError;
//! use mpp_energy::mark::{Mark, MarkId};
//! use mpp_energy::scheme::{EnergySchemeBuilder, IndividualEnergy, PairEnergy};
//!
//! #[derive(Debug, Clone)]
//! struct Disc { id: u64, x: f64, energy: f64 }
//!
//! impl Mark for Disc {
//!     fn id(&self) -> MarkId { MarkId::new(self.id) }
//! }
//!
//! struct Own;
//! impl IndividualEnergy<Disc, ()> for Own {
//!     fn energy(&self, d: &Disc, _: &()) -> Result<f64, EvaluationError> { Ok(d.energy) }
//! }
//!
//! struct Overlap;
//! impl PairEnergy<Disc, ()> for Overlap {
//!     fn interaction(&self, a: &Disc, b: &Disc, _: &()) -> Result<Option<f64>, EvaluationError> {
//!         Ok(((a.x - b.x).abs() < 1.0).then_some(2.0))
//!     }
//! }
//!
//! let scheme = EnergySchemeBuilder::new(Own).pair(Overlap).build();
//! let mut cache = EnergyCache::new(Configuration::new(), scheme, EnergyCacheConfig::default());
//! cache.init(&()).unwrap();
//!
//! cache.add(Disc { id: 1, x: 0.0, energy: 5.0 }, &()).unwrap();
//! cache.add(Disc { id: 2, x: 0.5, energy: 3.0 }, &()).unwrap();
//! assert_eq!(cache.total(), 10.0);
//!
//! cache.remove(0, &()).unwrap();
//! assert_eq!(cache.total(), 3.0);
//! ```

pub mod cache;
pub mod cfg;
pub mod config;
pub mod energy;
pub mod error;
pub mod mark;
pub mod scheme;
pub mod statistics;
pub mod trail;
pub mod voxel;

// Re-export commonly used types
pub use cfg::{Configuration, ConfigurationWithTotal};
pub use config::EnergyCacheConfig;
pub use energy::{EnergyBreakdown, EnergyCache};
pub use error::{EnergyError, EvaluationError};
pub use mark::{Mark, MarkId};
pub use scheme::{EnergyScheme, EnergySchemeBuilder};
pub use trail::{Snapshot, SnapshotTrail};
pub use voxel::VoxelizedEnergyCache;
