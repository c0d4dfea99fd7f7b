// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Energy evaluators and the scheme that bundles them.
//!
//! The caches never compute energy themselves. They call three external
//! collaborators, each handed the element being scored plus a caller-supplied
//! context `S` (typically the image stack and model parameters):
//!
//! - [`IndividualEnergy`]: the contribution of one mark on its own
//! - [`PairEnergy`]: the interaction predicate and edge energy for two marks
//! - [`AggregateEnergy`]: terms defined over the whole configuration at once
//!
//! An [`EnergyScheme`] is immutable once built and shared (via `Arc`) by every
//! copy of an energy cache, in the same way precomputed lookup data is shared
//! across independent search contexts.

use crate::error::EvaluationError;
use std::fmt;
use std::sync::Arc;

/// Per-mark energy evaluator.
pub trait IndividualEnergy<E, S: ?Sized> {
    /// Energy of `mark` on its own.
    fn energy(&self, mark: &E, ctx: &S) -> Result<f64, EvaluationError>;
}

/// Interaction predicate plus edge energy.
///
/// Should be symmetric: the caches call it with the lower-index mark first
/// during `init()` and with the pre-existing mark first during incremental
/// edits.
pub trait PairEnergy<E, S: ?Sized> {
    /// `Some(energy)` if `a` and `b` interact, `None` otherwise.
    ///
    /// A production implementation may narrow candidates with a spatial index
    /// before calling the exact test; the caches only see the answer.
    fn interaction(&self, a: &E, b: &E, ctx: &S) -> Result<Option<f64>, EvaluationError>;
}

/// Energy defined over the whole configuration.
pub trait AggregateEnergy<E, S: ?Sized> {
    /// Energy of the configuration `marks` as a whole.
    fn energy(&self, marks: &[E], ctx: &S) -> Result<f64, EvaluationError>;
}

/// The set of evaluators that define the total energy.
///
/// Build with [`EnergySchemeBuilder`]. The pairwise and aggregate terms are
/// optional; a missing term contributes zero.
pub struct EnergyScheme<E, S: ?Sized> {
    individual: Box<dyn IndividualEnergy<E, S>>,
    pair: Option<Box<dyn PairEnergy<E, S>>>,
    aggregate: Option<Box<dyn AggregateEnergy<E, S>>>,
}

impl<E, S: ?Sized> EnergyScheme<E, S> {
    pub fn individual(&self) -> &dyn IndividualEnergy<E, S> {
        self.individual.as_ref()
    }

    pub fn pair(&self) -> Option<&dyn PairEnergy<E, S>> {
        self.pair.as_deref()
    }

    pub fn aggregate(&self) -> Option<&dyn AggregateEnergy<E, S>> {
        self.aggregate.as_deref()
    }
}

impl<E, S: ?Sized> fmt::Debug for EnergyScheme<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnergyScheme")
            .field("pair", &self.pair.is_some())
            .field("aggregate", &self.aggregate.is_some())
            .finish()
    }
}

/// Builder for [`EnergyScheme`].
///
/// # Example
///
/// ```
/// use mpp_energy::error::EvaluationError;
/// use mpp_energy::scheme::{EnergySchemeBuilder, IndividualEnergy};
///
/// struct Constant;
/// impl IndividualEnergy<u32, ()> for Constant {
///     fn energy(&self, _: &u32, _: &()) -> Result<f64, EvaluationError> {
///         Ok(1.0)
///     }
/// }
///
/// let scheme = EnergySchemeBuilder::new(Constant).build();
/// assert!(scheme.pair().is_none());
/// ```
pub struct EnergySchemeBuilder<E, S: ?Sized> {
    scheme: EnergyScheme<E, S>,
}

impl<E, S: ?Sized> EnergySchemeBuilder<E, S> {
    /// Start a scheme with its individual term.
    pub fn new(individual: impl IndividualEnergy<E, S> + 'static) -> Self {
        Self {
            scheme: EnergyScheme {
                individual: Box::new(individual),
                pair: None,
                aggregate: None,
            },
        }
    }

    /// Set the pairwise term.
    pub fn pair(mut self, pair: impl PairEnergy<E, S> + 'static) -> Self {
        self.scheme.pair = Some(Box::new(pair));
        self
    }

    /// Set the aggregate term.
    pub fn aggregate(mut self, aggregate: impl AggregateEnergy<E, S> + 'static) -> Self {
        self.scheme.aggregate = Some(Box::new(aggregate));
        self
    }

    /// Build a shareable scheme.
    pub fn build(self) -> Arc<EnergyScheme<E, S>> {
        Arc::new(self.scheme)
    }
}
