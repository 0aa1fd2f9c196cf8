//! The port-symmetry pre-filter.
//!
//! Ports of the same type on the same component instance are
//! interchangeable: swapping them changes the matching but not the resulting
//! architecture. Replacing every port by its symmetry class gives a key that
//! is shared by all matchings equivalent under such swaps, and only the
//! first matching of every key is kept.

use itertools::Itertools;

use crate::matching::{Matching, MatchingIndex};

/// The sorted sequence of class pairs of `matching`.
///
/// `classes` maps every port to its symmetry class.
pub fn symmetry_key(matching: &Matching, classes: &[usize]) -> Vec<(usize, usize)> {
    matching
        .pairs()
        .iter()
        .map(|&(a, b)| {
            let (ca, cb) = (classes[a], classes[b]);
            (ca.min(cb), ca.max(cb))
        })
        .sorted_unstable()
        .collect()
}

/// Keep the first matching of every symmetry key.
///
/// `indices` holds the index of every matching and is filtered alongside.
pub fn filter_port_symmetry(
    matchings: Vec<Matching>,
    indices: Vec<MatchingIndex>,
    classes: &[usize],
) -> (Vec<Matching>, Vec<MatchingIndex>) {
    debug_assert_eq!(matchings.len(), indices.len());
    matchings
        .into_iter()
        .zip(indices)
        .unique_by(|(matching, _)| symmetry_key(matching, classes))
        .unzip()
}
