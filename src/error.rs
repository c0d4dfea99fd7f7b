// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Error types for energy cache maintenance.
//!
//! Two kinds of failure can come out of an edit:
//! - [`EnergyError::EvaluationFailed`]: an external evaluator, predicate or
//!   rasterizer reported an error.
//! - [`EnergyError::UpdateFailed`]: an incremental step found that a cache
//!   invariant no longer holds (e.g. a live mark with no adjacency entry).
//!
//! Both are fatal to the instance that produced them. The instance is poisoned
//! and later edits return [`EnergyError::Unusable`]; recovery means discarding
//! it and resuming from a snapshot taken before the failed edit.
//!
//! [`ValidationError`] is separate: it is what the debug consistency check
//! reports, and is a programming error rather than a production failure.

use crate::mark::MarkId;
use strum_macros::{Display, EnumCount as EnumCountMacro};
use thiserror::Error;

/// The component in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumCountMacro)]
#[strum(serialize_all = "snake_case")]
pub enum CacheStage {
    Individual,
    Pairwise,
    Aggregate,
    Voxelization,
}

/// Error reported by an external collaborator (energy evaluator, interaction
/// predicate or rasterizer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvaluationError {
    message: String,
}

impl EvaluationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by the energy cache edit operations.
#[derive(Debug, Clone, PartialEq, Eq, Error, EnumCountMacro)]
pub enum EnergyError {
    /// An evaluator failed while the named cache was being updated.
    #[error("{stage} evaluation failed for mark {mark}: {source}")]
    EvaluationFailed {
        stage: CacheStage,
        mark: MarkId,
        #[source]
        source: EvaluationError,
    },

    /// An incremental update could not preserve the cache invariant.
    #[error("{stage} cache update failed: {reason}")]
    UpdateFailed { stage: CacheStage, reason: String },

    /// An edit was attempted before `init()`.
    #[error("energy cache has not been initialized")]
    NotInitialized,

    /// An edit was attempted after an earlier failure poisoned the instance.
    #[error("energy cache is unusable after an earlier failure")]
    Unusable,
}

impl EnergyError {
    pub(crate) fn evaluation(stage: CacheStage, mark: MarkId, source: EvaluationError) -> Self {
        EnergyError::EvaluationFailed {
            stage,
            mark,
            source,
        }
    }

    pub(crate) fn update(stage: CacheStage, reason: impl Into<String>) -> Self {
        EnergyError::UpdateFailed {
            stage,
            reason: reason.into(),
        }
    }

    /// Position of this variant, used to index failure counters.
    pub(crate) fn ordinal(&self) -> usize {
        match self {
            EnergyError::EvaluationFailed { .. } => 0,
            EnergyError::UpdateFailed { .. } => 1,
            EnergyError::NotInitialized => 2,
            EnergyError::Unusable => 3,
        }
    }
}

/// A broken consistency invariant, as found by `check_valid()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("energy cache has not been initialized")]
    NotInitialized,

    #[error("total {total} differs from individual + pairwise + aggregate = {sum}")]
    TotalMismatch { total: f64, sum: f64 },

    #[error("individual cache has {entries} entries but the configuration has {marks} marks")]
    IndividualCount { entries: usize, marks: usize },

    #[error("individual running total {running} differs from the sum of entries {summed}")]
    IndividualDrift { running: f64, summed: f64 },

    #[error("pairwise running total {running} differs from the sum of entries {summed}")]
    PairwiseDrift { running: f64, summed: f64 },

    #[error("pair ({a}, {b}) references a mark outside the configuration")]
    SpanViolation { a: MarkId, b: MarkId },

    #[error("mark {mark} has no adjacency entry in the pairwise cache")]
    MissingAdjacency { mark: MarkId },

    #[error("pair ({a}, {b}) is recorded in the adjacency of only one of its marks")]
    AsymmetricAdjacency { a: MarkId, b: MarkId },

    #[error("mark {mark} has no voxelization memo entry")]
    MissingVoxelization { mark: MarkId },

    #[error("voxelization memo holds an entry for mark {mark}, which is not live")]
    StaleVoxelization { mark: MarkId },

    #[error("incremental total {total} has drifted from the recomputed total {recomputed}")]
    Drift { total: f64, recomputed: f64 },

    #[error("recomputing the total failed: {0}")]
    Recompute(#[source] EnergyError),
}
