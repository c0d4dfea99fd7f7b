// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Pairwise-energy cache: one cached scalar per interacting pair of marks.
//!
//! # Interaction Graph
//!
//! The cache is an undirected graph keyed by [`MarkId`]:
//! - every live mark has an adjacency entry (possibly empty)
//! - every interacting pair has exactly one edge, stored under a normalized
//!   [`PairKey`], and appears in the adjacency of both its marks
//!
//! Marks are keyed by identity rather than index because removing a mark
//! shifts the indices of every mark after it.
//!
//! # Incremental Maintenance
//!
//! An edit to one mark can change its interaction status with every other
//! mark, so:
//! - `add` tests the new mark against every existing mark, O(n) predicate calls
//! - `remove` deletes every edge incident to the removed mark, O(degree)
//! - `exchange` is `remove` of the old mark followed by `add` of the new one
//!   against the other live marks
//!
//! No partial-edit rollback is provided. If the predicate fails half way
//! through an `add`, the edges accepted so far stay in place; the owning energy
//! cache poisons itself and the caller rolls back by discarding the instance.

use crate::cfg::Configuration;
use crate::error::{CacheStage, EnergyError, ValidationError};
use crate::mark::{Mark, MarkId};
use crate::scheme::EnergyScheme;
use crate::statistics::{Counters, Statistics};
use crate::trail::Snapshot;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::trace;

/// An unordered pair of mark identities, stored lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    lo: MarkId,
    hi: MarkId,
}

impl PairKey {
    pub fn new(a: MarkId, b: MarkId) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    /// The two marks, lowest identity first.
    pub fn marks(self) -> (MarkId, MarkId) {
        (self.lo, self.hi)
    }

    /// Whether `id` is one of the two ends.
    pub fn touches(self, id: MarkId) -> bool {
        self.lo == id || self.hi == id
    }
}

#[derive(Debug, Clone, Default)]
struct InteractionGraph {
    /// Neighbours of each live mark
    adjacency: FxHashMap<MarkId, Vec<MarkId>>,
    /// Edge energy of each interacting pair
    edges: FxHashMap<PairKey, f64>,
    /// Running sum of `edges`
    total: f64,
}

impl InteractionGraph {
    fn insert_vertex(&mut self, id: MarkId) -> Result<(), EnergyError> {
        if self.adjacency.insert(id, Vec::new()).is_some() {
            return Err(EnergyError::update(
                CacheStage::Pairwise,
                format!("mark {} is already present", id),
            ));
        }
        Ok(())
    }

    fn insert_edge(&mut self, a: MarkId, b: MarkId, energy: f64) {
        self.edges.insert(PairKey::new(a, b), energy);
        self.total += energy;
        for (from, to) in [(a, b), (b, a)] {
            if let Some(neighbours) = self.adjacency.get_mut(&from) {
                neighbours.push(to);
            }
        }
    }

    /// Remove `id` and every edge incident to it. Returns the energy removed.
    fn remove_vertex(&mut self, id: MarkId) -> Result<f64, EnergyError> {
        let neighbours = self.adjacency.remove(&id).ok_or_else(|| {
            EnergyError::update(
                CacheStage::Pairwise,
                format!("mark {} has no adjacency entry", id),
            )
        })?;

        let mut removed = 0.0;
        for other in neighbours {
            let energy = self.edges.remove(&PairKey::new(id, other)).ok_or_else(|| {
                EnergyError::update(
                    CacheStage::Pairwise,
                    format!("pair ({}, {}) is adjacent but has no edge", id, other),
                )
            })?;
            let back = self.adjacency.get_mut(&other).ok_or_else(|| {
                EnergyError::update(
                    CacheStage::Pairwise,
                    format!("neighbour {} of {} has no adjacency entry", other, id),
                )
            })?;
            back.retain(|&n| n != id);
            removed += energy;
        }
        self.total -= removed;
        Ok(removed)
    }
}

/// Cached pairwise energies over the interaction graph.
///
/// Cloning shares the graph copy-on-write; the first edit through either
/// clone copies it.
#[derive(Debug, Clone, Default)]
pub struct PairwiseEnergyCache {
    graph: Arc<InteractionGraph>,
}

impl PairwiseEnergyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the cache by testing every unordered pair of `marks` once.
    pub fn init<E: Mark, S: ?Sized>(
        marks: &[E],
        scheme: &EnergyScheme<E, S>,
        ctx: &S,
        stats: &mut Statistics,
    ) -> Result<Self, EnergyError> {
        let mut graph = InteractionGraph::default();
        for mark in marks {
            graph.insert_vertex(mark.id())?;
        }
        for (i, a) in marks.iter().enumerate() {
            for b in &marks[i + 1..] {
                if let Some(energy) = test_pair(a, b, scheme, ctx, stats)? {
                    graph.insert_edge(a.id(), b.id(), energy);
                }
            }
        }
        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    /// Wire `mark` into the graph, testing it against each of `existing`.
    ///
    /// `existing` must not contain `mark` itself. Returns the pairwise energy
    /// added.
    pub fn add<'a, E, S, I>(
        &mut self,
        mark: &E,
        existing: I,
        scheme: &EnergyScheme<E, S>,
        ctx: &S,
        stats: &mut Statistics,
    ) -> Result<f64, EnergyError>
    where
        E: Mark + 'a,
        S: ?Sized,
        I: IntoIterator<Item = &'a E>,
    {
        let graph = Arc::make_mut(&mut self.graph);
        graph.insert_vertex(mark.id())?;

        let mut added = 0.0;
        for other in existing {
            if let Some(energy) = test_pair(other, mark, scheme, ctx, stats)? {
                graph.insert_edge(other.id(), mark.id(), energy);
                added += energy;
            }
        }
        Ok(added)
    }

    /// Delete `id` and every edge incident to it. Returns the pairwise energy
    /// removed.
    pub fn remove(&mut self, id: MarkId) -> Result<f64, EnergyError> {
        Arc::make_mut(&mut self.graph).remove_vertex(id)
    }

    /// Replace `old` by `mark`: drop the old mark's edges, then wire the new
    /// mark against `others` (the live marks other than the one being
    /// replaced).
    ///
    /// Returns the change in pairwise energy.
    pub fn exchange<'a, E, S, I>(
        &mut self,
        old: MarkId,
        mark: &E,
        others: I,
        scheme: &EnergyScheme<E, S>,
        ctx: &S,
        stats: &mut Statistics,
    ) -> Result<f64, EnergyError>
    where
        E: Mark + 'a,
        S: ?Sized,
        I: IntoIterator<Item = &'a E>,
    {
        let removed = self.remove(old)?;
        let added = self.add(mark, others, scheme, ctx, stats)?;
        Ok(added - removed)
    }

    pub fn total(&self) -> f64 {
        self.graph.total
    }

    /// Number of interacting pairs.
    pub fn len(&self) -> usize {
        self.graph.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edges.is_empty()
    }

    /// Edge energy of the pair `(a, b)`, if they interact.
    pub fn get(&self, a: MarkId, b: MarkId) -> Option<f64> {
        self.graph.edges.get(&PairKey::new(a, b)).copied()
    }

    /// Marks interacting with `id`. Empty if `id` is not live.
    pub fn neighbours(&self, id: MarkId) -> &[MarkId] {
        self.graph
            .adjacency
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `id` has an adjacency entry.
    pub fn contains_mark(&self, id: MarkId) -> bool {
        self.graph.adjacency.contains_key(&id)
    }

    /// All interacting pairs with their edge energies, in no particular order.
    pub fn pairs(&self) -> impl Iterator<Item = (PairKey, f64)> + '_ {
        self.graph.edges.iter().map(|(&key, &energy)| (key, energy))
    }

    /// Whether every pair's two marks are present in `cfg`.
    pub fn is_configuration_span<E: Mark>(&self, cfg: &Configuration<E>) -> bool {
        let live: FxHashSet<MarkId> = cfg.ids().collect();
        self.graph
            .edges
            .keys()
            .all(|key| live.contains(&key.lo) && live.contains(&key.hi))
    }

    /// Full consistency check against `cfg`: span, one adjacency entry per live
    /// mark, symmetric adjacency, and running total against a fresh sum.
    pub fn check<E: Mark>(
        &self,
        cfg: &Configuration<E>,
        tolerance: f64,
    ) -> Result<(), ValidationError> {
        let graph = &self.graph;
        let live: FxHashSet<MarkId> = cfg.ids().collect();

        for key in graph.edges.keys() {
            if !live.contains(&key.lo) || !live.contains(&key.hi) {
                return Err(ValidationError::SpanViolation {
                    a: key.lo,
                    b: key.hi,
                });
            }
            let forward = graph.adjacency.get(&key.lo).map(|n| n.contains(&key.hi));
            let backward = graph.adjacency.get(&key.hi).map(|n| n.contains(&key.lo));
            if forward != Some(true) || backward != Some(true) {
                return Err(ValidationError::AsymmetricAdjacency {
                    a: key.lo,
                    b: key.hi,
                });
            }
        }

        for id in &live {
            if !graph.adjacency.contains_key(id) {
                return Err(ValidationError::MissingAdjacency { mark: *id });
            }
        }

        let summed: f64 = graph.edges.values().sum();
        if (summed - graph.total).abs() > tolerance * summed.abs().max(1.0) {
            return Err(ValidationError::PairwiseDrift {
                running: graph.total,
                summed,
            });
        }
        Ok(())
    }
}

impl Snapshot for PairwiseEnergyCache {
    fn shallow_copy(&self) -> Self {
        self.clone()
    }

    fn deep_copy(&self) -> Self {
        Self {
            graph: Arc::new(self.graph.as_ref().clone()),
        }
    }
}

fn test_pair<E: Mark, S: ?Sized>(
    a: &E,
    b: &E,
    scheme: &EnergyScheme<E, S>,
    ctx: &S,
    stats: &mut Statistics,
) -> Result<Option<f64>, EnergyError> {
    let Some(pair) = scheme.pair() else {
        return Ok(None);
    };
    stats.increment_counter(Counters::PairTests);
    let result = pair
        .interaction(a, b, ctx)
        .map_err(|source| EnergyError::evaluation(CacheStage::Pairwise, b.id(), source))?;
    if let Some(energy) = result {
        stats.increment_counter(Counters::PairsAccepted);
        trace!(a = %a.id(), b = %b.id(), energy, "pair accepted");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvaluationError;
    use crate::scheme::{EnergySchemeBuilder, IndividualEnergy, PairEnergy};

    /// A point on a line; points within distance 1 interact.
    #[derive(Debug, Clone)]
    struct Point(u64, f64);

    impl Mark for Point {
        fn id(&self) -> MarkId {
            MarkId::new(self.0)
        }
    }

    struct Zero;

    impl IndividualEnergy<Point, ()> for Zero {
        fn energy(&self, _: &Point, _: &()) -> Result<f64, EvaluationError> {
            Ok(0.0)
        }
    }

    struct Near;

    impl PairEnergy<Point, ()> for Near {
        fn interaction(&self, a: &Point, b: &Point, _: &()) -> Result<Option<f64>, EvaluationError> {
            if a.1.is_nan() || b.1.is_nan() {
                return Err(EvaluationError::new("position is NaN"));
            }
            let d = (a.1 - b.1).abs();
            Ok((d <= 1.0).then_some(1.0 - d))
        }
    }

    fn scheme() -> Arc<EnergyScheme<Point, ()>> {
        EnergySchemeBuilder::new(Zero).pair(Near).build()
    }

    fn ids(values: &[u64]) -> Vec<MarkId> {
        values.iter().copied().map(MarkId::new).collect()
    }

    #[test]
    fn test_pair_key_is_unordered() {
        let k1 = PairKey::new(MarkId::new(5), MarkId::new(2));
        let k2 = PairKey::new(MarkId::new(2), MarkId::new(5));
        assert_eq!(k1, k2);
        assert_eq!(k1.marks(), (MarkId::new(2), MarkId::new(5)));
        assert!(k1.touches(MarkId::new(5)));
        assert!(!k1.touches(MarkId::new(3)));
    }

    #[test]
    fn test_init_tests_each_pair_once() {
        let scheme = scheme();
        let mut stats = Statistics::new();
        let marks = vec![Point(1, 0.0), Point(2, 0.5), Point(3, 5.0)];

        let cache = PairwiseEnergyCache::init(&marks, &scheme, &(), &mut stats).unwrap();
        assert_eq!(stats.get(Counters::PairTests), 3);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(MarkId::new(2), MarkId::new(1)), Some(0.5));
        assert_eq!(cache.total(), 0.5);
        assert!(cache.neighbours(MarkId::new(3)).is_empty());
        assert!(cache.contains_mark(MarkId::new(3)));
    }

    #[test]
    fn test_add_then_remove_restores() {
        let scheme = scheme();
        let mut stats = Statistics::new();
        let marks = vec![Point(1, 0.0), Point(2, 2.0)];
        let mut cache = PairwiseEnergyCache::init(&marks, &scheme, &(), &mut stats).unwrap();
        assert!(cache.is_empty());

        let added = cache
            .add(&Point(3, 1.0), &marks, &scheme, &(), &mut stats)
            .unwrap();
        assert_eq!(added, 0.0); // Both at distance exactly 1
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.neighbours(MarkId::new(3)), ids(&[1, 2]).as_slice());

        let removed = cache.remove(MarkId::new(3)).unwrap();
        assert_eq!(removed, 0.0);
        assert!(cache.is_empty());
        assert!(cache.neighbours(MarkId::new(1)).is_empty());
        assert!(cache.neighbours(MarkId::new(2)).is_empty());
    }

    #[test]
    fn test_exchange_rewires() {
        let scheme = scheme();
        let mut stats = Statistics::new();
        let marks = vec![Point(1, 0.0), Point(2, 0.25), Point(3, 3.0)];
        let mut cache = PairwiseEnergyCache::init(&marks, &scheme, &(), &mut stats).unwrap();
        assert_eq!(cache.len(), 1);

        // Move mark 2 next to mark 3
        let others = [&marks[0], &marks[2]];
        let delta = cache
            .exchange(MarkId::new(2), &Point(4, 2.5), others, &scheme, &(), &mut stats)
            .unwrap();
        assert_eq!(delta, 0.5 - 0.75);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(MarkId::new(3), MarkId::new(4)), Some(0.5));
        assert!(cache.get(MarkId::new(1), MarkId::new(2)).is_none());
        assert!(!cache.contains_mark(MarkId::new(2)));
    }

    #[test]
    fn test_duplicate_identity_is_update_failure() {
        let scheme = scheme();
        let mut stats = Statistics::new();
        let marks = vec![Point(1, 0.0)];
        let mut cache = PairwiseEnergyCache::init(&marks, &scheme, &(), &mut stats).unwrap();

        let err = cache
            .add(&Point(1, 4.0), &marks, &scheme, &(), &mut stats)
            .unwrap_err();
        assert!(matches!(
            err,
            EnergyError::UpdateFailed {
                stage: CacheStage::Pairwise,
                ..
            }
        ));
    }

    #[test]
    fn test_remove_unknown_is_update_failure() {
        let mut cache = PairwiseEnergyCache::new();
        let err = cache.remove(MarkId::new(9)).unwrap_err();
        assert!(matches!(err, EnergyError::UpdateFailed { .. }));
    }

    #[test]
    fn test_predicate_failure_surfaces() {
        let scheme = scheme();
        let mut stats = Statistics::new();
        let marks = vec![Point(1, 0.0)];
        let mut cache = PairwiseEnergyCache::init(&marks, &scheme, &(), &mut stats).unwrap();

        let err = cache
            .add(&Point(2, f64::NAN), &marks, &scheme, &(), &mut stats)
            .unwrap_err();
        assert_eq!(
            err,
            EnergyError::EvaluationFailed {
                stage: CacheStage::Pairwise,
                mark: MarkId::new(2),
                source: EvaluationError::new("position is NaN"),
            }
        );
    }

    #[test]
    fn test_span_and_check() {
        let scheme = scheme();
        let mut stats = Statistics::new();
        let marks = vec![Point(1, 0.0), Point(2, 0.5)];
        let cache = PairwiseEnergyCache::init(&marks, &scheme, &(), &mut stats).unwrap();

        let cfg = Configuration::from_marks(marks.clone());
        assert!(cache.is_configuration_span(&cfg));
        assert!(cache.check(&cfg, 1e-6).is_ok());

        let shrunk = Configuration::from_marks(vec![marks[0].clone()]);
        assert!(!cache.is_configuration_span(&shrunk));
        assert!(matches!(
            cache.check(&shrunk, 1e-6),
            Err(ValidationError::SpanViolation { .. })
        ));
    }

    #[test]
    fn test_without_pair_term_tracks_marks_only() {
        let scheme = EnergySchemeBuilder::new(Zero).build();
        let mut stats = Statistics::new();
        let marks = vec![Point(1, 0.0), Point(2, 0.0)];
        let cache = PairwiseEnergyCache::init(&marks, &scheme, &(), &mut stats).unwrap();

        assert!(cache.is_empty());
        assert!(cache.contains_mark(MarkId::new(2)));
        assert_eq!(stats.get(Counters::PairTests), 0);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let scheme = scheme();
        let mut stats = Statistics::new();
        let marks = vec![Point(1, 0.0), Point(2, 0.5)];
        let mut cache = PairwiseEnergyCache::init(&marks, &scheme, &(), &mut stats).unwrap();
        let copy = cache.deep_copy();

        cache.remove(MarkId::new(1)).unwrap();
        assert_eq!(copy.len(), 1);
        assert!(cache.is_empty());
    }
}
