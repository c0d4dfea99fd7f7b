// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Mark identity.
//!
//! A mark is an opaque geometric object (an ellipse, a polygon, a segmented
//! region). The caches never look inside it; they only need a stable identity
//! to key pairwise entries and voxelization memo entries on, since indices
//! shift whenever a mark is removed.
//!
//! Identity says which slot of the configuration a mark occupies, not what it
//! looks like: an exchange may install a mark with the outgoing identity and a
//! different geometry. No cache entry may be reused on identity alone.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkId(u64);

impl MarkId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for MarkId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// An object that can take part in a configuration.
///
/// Cloning is expected to be cheap (a handle or a small value); configurations
/// and snapshots clone marks freely.
pub trait Mark: Clone + fmt::Debug {
    /// The identity of this mark. Must not change for the lifetime of the value.
    fn id(&self) -> MarkId;
}
