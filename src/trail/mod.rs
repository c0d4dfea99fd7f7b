// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Snapshot-based rollback for branch-and-reject search.
//!
//! An optimizer proposes an edit, evaluates the new total, and either keeps
//! the edit or throws it away. Rather than undoing the edit step by step, the
//! trail keeps shallow copies taken before each proposal. Rejecting a proposal
//! restores the copy; accepting it drops the copy.
//!
//! Shallow copies share storage copy-on-write, so a checkpoint costs O(1)
//! until the live instance is next edited.
//!
//! A failed edit poisons the live instance. Rewinding to the checkpoint taken
//! before it is the recovery path.

/// Types that can be copied for rollback.
///
/// Both copies must be independent of the original as far as later edits are
/// concerned: an edit made through one is never visible through the other.
pub trait Snapshot: Sized {
    /// O(1) copy that shares storage with the original until either is edited.
    fn shallow_copy(&self) -> Self;

    /// Copy that clones all per-mark storage eagerly.
    fn deep_copy(&self) -> Self;
}

/// A stack of snapshots for nested rollback.
///
/// # Example
///
/// ```
/// use mpp_energy::cfg::Configuration;
/// use mpp_energy::mark::{Mark, MarkId};
/// use mpp_energy::trail::SnapshotTrail;
///
/// #[derive(Debug, Clone)]
/// struct Dot(u64);
/// impl Mark for Dot {
///     fn id(&self) -> MarkId { MarkId::new(self.0) }
/// }
///
/// let mut live = Configuration::from_marks(vec![Dot(1)]);
/// let mut trail = SnapshotTrail::new();
///
/// trail.checkpoint(&live);
/// live.add(Dot(2));
///
/// // Reject the proposal
/// live = trail.rewind().unwrap();
/// assert_eq!(live.len(), 1);
/// ```
#[derive(Debug)]
pub struct SnapshotTrail<T> {
    /// Snapshots, oldest first
    snapshots: Vec<T>,
    /// Depth below which rewinding is not allowed
    frozen_depth: Option<usize>,
    /// Maximum number of outstanding checkpoints
    max_depth: usize,
}

impl<T: Snapshot> SnapshotTrail<T> {
    /// Default maximum depth.
    pub const DEFAULT_MAX_DEPTH: usize = 1024;

    /// Create a new empty trail.
    pub fn new() -> Self {
        Self::with_max_depth(Self::DEFAULT_MAX_DEPTH)
    }

    /// Create a new empty trail allowing at most `max_depth` checkpoints.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            snapshots: Vec::with_capacity(max_depth.min(64)),
            frozen_depth: None,
            max_depth,
        }
    }

    /// Record a shallow copy of `current` for later rollback.
    ///
    /// Returns the depth of the new checkpoint.
    ///
    /// # Panics
    ///
    /// Panics if the trail already holds `max_depth` checkpoints (a search that
    /// never commits or rewinds is a bug in the caller).
    pub fn checkpoint(&mut self, current: &T) -> usize {
        if self.snapshots.len() >= self.max_depth {
            panic!("Trail overflow: exceeded {} checkpoints", self.max_depth);
        }
        self.snapshots.push(current.shallow_copy());
        self.snapshots.len()
    }

    /// Pop the most recent checkpoint and return it, to replace the live
    /// instance.
    ///
    /// Returns `None` if there is no checkpoint, or if the most recent one is
    /// at or below the frozen depth.
    pub fn rewind(&mut self) -> Option<T> {
        if let Some(frozen) = self.frozen_depth {
            if self.snapshots.len() <= frozen {
                return None;
            }
        }
        self.snapshots.pop()
    }

    /// Drop the most recent checkpoint, keeping the live instance.
    ///
    /// Returns true if there was a checkpoint to drop.
    pub fn commit(&mut self) -> bool {
        if let Some(frozen) = self.frozen_depth {
            if self.snapshots.len() <= frozen {
                return false;
            }
        }
        self.snapshots.pop().is_some()
    }

    /// Freeze the trail at the current depth.
    ///
    /// After freezing, no checkpoint recorded so far can be rewound or
    /// committed.
    pub fn freeze(&mut self) {
        self.frozen_depth = Some(self.snapshots.len());
    }

    /// The most recent checkpoint, without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.snapshots.last()
    }

    /// Get the number of outstanding checkpoints.
    pub fn checkpoint_depth(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if there are no outstanding checkpoints.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl<T: Snapshot> Default for SnapshotTrail<T> {
    fn default() -> Self {
        Self::new()
    }
}
