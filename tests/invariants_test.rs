// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Property tests: random edit sequences keep the cached total equal to a
//! from-scratch evaluation.

mod common;

use common::{brute_force_total, interval_cache, Interval, Scene};
use mpp_energy::cache::PairKey;
use mpp_energy::energy::EnergyCache;
use mpp_energy::trail::Snapshot;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(f64, f64, f64),
    Remove(usize),
    RemoveTwo(usize, usize),
    Exchange(usize, f64, f64, f64),
}

fn shape() -> impl Strategy<Value = (f64, f64, f64)> {
    (0.0f64..20.0, 0.1f64..2.0, -2.0f64..5.0)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => shape().prop_map(|(c, r, w)| Op::Add(c, r, w)),
        1 => any::<usize>().prop_map(Op::Remove),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(i, j)| Op::RemoveTwo(i, j)),
        2 => (any::<usize>(), shape()).prop_map(|(i, (c, r, w))| Op::Exchange(i, c, r, w)),
    ]
}

fn seed_marks() -> impl Strategy<Value = Vec<Interval>> {
    proptest::collection::vec(shape(), 0..12).prop_map(|shapes| {
        shapes
            .into_iter()
            .enumerate()
            .map(|(i, (c, r, w))| Interval::new(i as u64, c, r, w))
            .collect()
    })
}

fn sorted_pairs(cache: &EnergyCache<Interval, Scene>) -> Vec<(PairKey, f64)> {
    let mut pairs: Vec<_> = cache.pairs().collect();
    pairs.sort_by_key(|(key, _)| *key);
    pairs
}

/// Apply `op` if it fits the current configuration. Fresh marks get ids from
/// `next_id`.
fn apply(cache: &mut EnergyCache<Interval, Scene>, op: &Op, next_id: &mut u64, scene: &Scene) {
    let len = cache.len();
    match *op {
        Op::Add(c, r, w) => {
            *next_id += 1;
            cache.add(Interval::new(*next_id, c, r, w), scene).unwrap();
        }
        Op::Remove(pick) if len > 0 => {
            cache.remove(pick % len, scene).unwrap();
        }
        Op::RemoveTwo(first, second) if len > 1 => {
            let i = first % len;
            let mut j = second % (len - 1);
            if j >= i {
                j += 1;
            }
            cache.remove_two(i, j, scene).unwrap();
        }
        Op::Exchange(pick, c, r, w) if len > 0 => {
            *next_id += 1;
            cache
                .exchange(pick % len, Interval::new(*next_id, c, r, w), scene)
                .unwrap();
        }
        _ => {}
    }
}

proptest! {
    #[test]
    fn prop_total_matches_recomputation(
        seed in seed_marks(),
        ops in proptest::collection::vec(op(), 1..40),
    ) {
        let scene = Scene::default();
        let mut next_id = 1_000;
        let mut cache = interval_cache(seed, &scene);

        for op in &ops {
            apply(&mut cache, op, &mut next_id, &scene);

            prop_assert!(cache.check_valid().is_ok());
            prop_assert!(cache.is_configuration_span());
            let recomputed = cache.recomputed_total(&scene).unwrap();
            prop_assert!(cache.config().tolerances.total_agrees(cache.total(), recomputed));

            let marks: Vec<Interval> = cache.configuration().iter().cloned().collect();
            let brute = brute_force_total(&marks, &scene);
            prop_assert!(cache.config().tolerances.total_agrees(cache.total(), brute));
        }
    }

    #[test]
    fn prop_add_remove_round_trip(
        seed in seed_marks(),
        (c, r, w) in shape(),
    ) {
        let scene = Scene::default();
        let mut cache = interval_cache(seed, &scene);
        let total = cache.total();
        let pairs = cache.pair_count();

        cache.add(Interval::new(999, c, r, w), &scene).unwrap();
        cache.remove(cache.len() - 1, &scene).unwrap();

        prop_assert!((cache.total() - total).abs() <= 1e-6);
        prop_assert_eq!(cache.pair_count(), pairs);
    }

    #[test]
    fn prop_exchange_equals_remove_then_add(
        seed in seed_marks(),
        pick in any::<usize>(),
        (c, r, w) in shape(),
    ) {
        prop_assume!(!seed.is_empty());
        let scene = Scene::default();
        let cache = interval_cache(seed, &scene);
        let index = pick % cache.len();
        let incoming = Interval::new(999, c, r, w);

        let mut exchanged = cache.shallow_copy();
        exchanged.exchange(index, incoming.clone(), &scene).unwrap();

        let mut replaced = cache.shallow_copy();
        replaced.remove(index, &scene).unwrap();
        replaced.add(incoming, &scene).unwrap();

        let tolerances = cache.config().tolerances;
        prop_assert!(tolerances.exchange_agrees(exchanged.total(), replaced.total()));
        prop_assert_eq!(exchanged.len(), replaced.len());

        let a = sorted_pairs(&exchanged);
        let b = sorted_pairs(&replaced);
        prop_assert_eq!(a.len(), b.len());
        for ((ka, ea), (kb, eb)) in a.iter().zip(&b) {
            prop_assert_eq!(ka, kb);
            prop_assert!(tolerances.exchange_agrees(*ea, *eb));
        }

        // The original is untouched by either branch
        cache.assert_valid();
    }

    #[test]
    fn prop_copies_report_the_same_total(
        seed in seed_marks(),
        ops in proptest::collection::vec(op(), 0..10),
    ) {
        let scene = Scene::default();
        let mut next_id = 1_000;
        let mut cache = interval_cache(seed, &scene);
        for op in &ops {
            apply(&mut cache, op, &mut next_id, &scene);
        }

        let shallow = cache.shallow_copy();
        let deep = cache.deep_copy();
        prop_assert_eq!(shallow.total(), cache.total());
        prop_assert_eq!(deep.total(), cache.total());
        prop_assert_eq!(deep.pair_count(), cache.pair_count());
    }
}
