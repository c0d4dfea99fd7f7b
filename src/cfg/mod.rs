// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Configurations: ordered, indexable sequences of marks.
//!
//! # Copy-on-write
//!
//! The mark list lives behind an `Arc`. A shallow copy clones the `Arc` and is
//! O(1); the first edit made through either copy clones the list (via
//! `Arc::make_mut`), so an edit never becomes visible through another copy.
//! A deep copy clones the list eagerly.
//!
//! Indices are dense `[0, len)`. `remove` compacts the list, so callers must
//! resolve every index against the configuration as it was *before* the edit.
//! An out-of-range index is a programming error and panics.

pub mod ledger;

pub use ledger::ConfigurationWithTotal;

use crate::mark::{Mark, MarkId};
use crate::trail::Snapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An ordered sequence of marks with copy-on-write storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration<E> {
    marks: Arc<Vec<E>>,
}

impl<E: Mark> Configuration<E> {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self {
            marks: Arc::new(Vec::new()),
        }
    }

    /// Create a configuration seeded with `marks`, in order.
    pub fn from_marks(marks: Vec<E>) -> Self {
        Self {
            marks: Arc::new(marks),
        }
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// The mark at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn get(&self, index: usize) -> &E {
        self.check_index(index);
        &self.marks[index]
    }

    pub fn marks(&self) -> &[E] {
        &self.marks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.marks.iter()
    }

    /// Identities of all marks, in order.
    pub fn ids(&self) -> impl Iterator<Item = MarkId> + '_ {
        self.marks.iter().map(Mark::id)
    }

    /// Index of the mark with identity `id`, if present. O(n).
    pub fn position(&self, id: MarkId) -> Option<usize> {
        self.marks.iter().position(|m| m.id() == id)
    }

    pub fn contains(&self, id: MarkId) -> bool {
        self.position(id).is_some()
    }

    /// Append `mark` at the end. Its index is `len() - 1` afterwards.
    pub fn add(&mut self, mark: E) {
        Arc::make_mut(&mut self.marks).push(mark);
    }

    /// Remove and return the mark at `index`, compacting the list.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn remove(&mut self, index: usize) -> E {
        self.check_index(index);
        Arc::make_mut(&mut self.marks).remove(index)
    }

    /// Remove the marks at two distinct indices of the pre-edit configuration.
    ///
    /// Returns the removed marks in the order `(at i, at j)`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range or `i == j`.
    pub fn remove_two(&mut self, i: usize, j: usize) -> (E, E) {
        self.check_index(i);
        self.check_index(j);
        assert_ne!(i, j, "remove_two requires two distinct indices");

        let marks = Arc::make_mut(&mut self.marks);
        // Higher index first so the lower one stays valid
        if i > j {
            let at_i = marks.remove(i);
            let at_j = marks.remove(j);
            (at_i, at_j)
        } else {
            let at_j = marks.remove(j);
            let at_i = marks.remove(i);
            (at_i, at_j)
        }
    }

    /// Replace the mark at `index` with `mark`, returning the old mark.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn exchange(&mut self, index: usize, mark: E) -> E {
        self.check_index(index);
        std::mem::replace(&mut Arc::make_mut(&mut self.marks)[index], mark)
    }

    /// Whether `self` and `other` currently share mark storage.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.marks, &other.marks)
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.marks.len(),
            "index {} out of range for configuration of {} marks",
            index,
            self.marks.len()
        );
    }
}

impl<E: Mark> Default for Configuration<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Mark> Snapshot for Configuration<E> {
    fn shallow_copy(&self) -> Self {
        Self {
            marks: Arc::clone(&self.marks),
        }
    }

    fn deep_copy(&self) -> Self {
        Self {
            marks: Arc::new(self.marks.as_ref().clone()),
        }
    }
}

impl<'a, E: Mark> IntoIterator for &'a Configuration<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.marks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Dot(u64);

    impl Mark for Dot {
        fn id(&self) -> MarkId {
            MarkId::new(self.0)
        }
    }

    fn cfg_of(ids: &[u64]) -> Configuration<Dot> {
        Configuration::from_marks(ids.iter().map(|&i| Dot(i)).collect())
    }

    fn ids_of(cfg: &Configuration<Dot>) -> Vec<u64> {
        cfg.ids().map(MarkId::value).collect()
    }

    #[test]
    fn test_add_appends() {
        let mut cfg = Configuration::new();
        cfg.add(Dot(3));
        cfg.add(Dot(9));
        assert_eq!(ids_of(&cfg), vec![3, 9]);
        assert_eq!(cfg.position(MarkId::new(9)), Some(1));
    }

    #[test]
    fn test_remove_compacts() {
        let mut cfg = cfg_of(&[1, 2, 3, 4]);
        assert_eq!(cfg.remove(1), Dot(2));
        assert_eq!(ids_of(&cfg), vec![1, 3, 4]);
    }

    #[test]
    fn test_remove_two_uses_pre_edit_indices() {
        let mut cfg = cfg_of(&[10, 11, 12, 13, 14]);
        let (a, b) = cfg.remove_two(1, 3);
        assert_eq!((a, b), (Dot(11), Dot(13)));
        assert_eq!(ids_of(&cfg), vec![10, 12, 14]);

        let mut cfg = cfg_of(&[10, 11, 12, 13, 14]);
        let (a, b) = cfg.remove_two(4, 0);
        assert_eq!((a, b), (Dot(14), Dot(10)));
        assert_eq!(ids_of(&cfg), vec![11, 12, 13]);
    }

    #[test]
    fn test_exchange_returns_old() {
        let mut cfg = cfg_of(&[1, 2, 3]);
        assert_eq!(cfg.exchange(2, Dot(7)), Dot(3));
        assert_eq!(ids_of(&cfg), vec![1, 2, 7]);
    }

    #[test]
    fn test_shallow_copy_is_copy_on_write() {
        let original = cfg_of(&[1, 2]);
        let mut copy = original.shallow_copy();
        assert!(copy.shares_storage_with(&original));

        copy.add(Dot(3));
        assert!(!copy.shares_storage_with(&original));
        assert_eq!(ids_of(&original), vec![1, 2]);
        assert_eq!(ids_of(&copy), vec![1, 2, 3]);
    }

    #[test]
    fn test_deep_copy_does_not_share() {
        let original = cfg_of(&[1, 2]);
        let copy = original.deep_copy();
        assert!(!copy.shares_storage_with(&original));
        assert_eq!(ids_of(&copy), ids_of(&original));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_remove_out_of_range_panics() {
        let mut cfg = cfg_of(&[1]);
        cfg.remove(1);
    }

    #[test]
    #[should_panic(expected = "distinct")]
    fn test_remove_two_same_index_panics() {
        let mut cfg = cfg_of(&[1, 2]);
        cfg.remove_two(1, 1);
    }
}
