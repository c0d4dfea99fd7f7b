// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Statistics
//!
//! Statistics are stored per energy cache instance and copied with it, so a
//! rejected proposal rolls its counts back along with its energy.

use crate::error::EnergyError;
use strum::EnumCount;
use strum_macros::EnumCount as EnumCountMacro;

#[derive(Debug, EnumCountMacro, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Counters {
    IndividualEvaluations,
    PairTests,
    PairsAccepted,
    AggregateRecomputes,
    Adds,
    Removes,
    Exchanges,
    VoxelizationsComputed,
}

const COUNT: usize = Counters::COUNT + EnergyError::COUNT;

#[derive(Debug, Default, Clone)]
pub struct Statistics {
    stats: [u64; COUNT],
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    /// Increment the specified counter by 1.
    pub(crate) fn increment_counter(&mut self, counter: Counters) {
        self.stats[counter as usize] += 1;
    }

    /// Add every counter of `other` into this one.
    pub(crate) fn merge(&mut self, other: &Statistics) {
        for (mine, theirs) in self.stats.iter_mut().zip(other.stats.iter()) {
            *mine += theirs;
        }
    }

    /// Record one occurrence of `error`.
    pub(crate) fn record_failure(&mut self, error: &EnergyError) {
        self.stats[Counters::COUNT + error.ordinal()] += 1;
    }

    /// Get the current value of the specified counter.
    pub fn get(&self, counter: Counters) -> u64 {
        self.stats[counter as usize]
    }

    /// Number of failures recorded of the same kind as `error`.
    pub fn failures(&self, error: &EnergyError) -> u64 {
        self.stats[Counters::COUNT + error.ordinal()]
    }

    /// Total number of failures of any kind.
    pub fn total_failures(&self) -> u64 {
        self.stats[Counters::COUNT..].iter().sum()
    }
}
