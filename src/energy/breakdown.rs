// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Decomposition of the total energy into its three parts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three cached parts of the total energy, and the total itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyBreakdown {
    pub individual: f64,
    pub pairwise: f64,
    pub aggregate: f64,
    /// The total recorded in the ledger
    pub total: f64,
}

impl EnergyBreakdown {
    /// `individual + pairwise + aggregate`.
    pub fn sum(&self) -> f64 {
        self.individual + self.pairwise + self.aggregate
    }

    /// Difference between the recorded total and the sum of the parts.
    pub fn discrepancy(&self) -> f64 {
        self.total - self.sum()
    }
}

impl fmt::Display for EnergyBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total {:.6} = individual {:.6} + pairwise {:.6} + aggregate {:.6}",
            self.total, self.individual, self.pairwise, self.aggregate
        )
    }
}
