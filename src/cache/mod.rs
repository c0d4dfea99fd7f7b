// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The three energy caches.
//!
//! Each cache owns one part of the total:
//! - `individual`: per-mark terms, updated only for the touched mark
//! - `pairwise`: per-interacting-pair terms, re-wired around the touched mark
//! - `aggregate`: whole-configuration terms, recomputed on every refresh
//!
//! The caches do not know about each other. `EnergyCache` sequences them.

pub mod aggregate;
pub mod individual;
pub mod pairwise;

pub use aggregate::AggregateEnergyCache;
pub use individual::IndividualEnergyCache;
pub use pairwise::{PairKey, PairwiseEnergyCache};
