//! Matchings of ports.

pub mod rank;

use std::fmt;

use derive_more::{From, Into};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::port_model::AdjacencyMatrix;

pub use rank::{perfect_matching_count, RankError};

/// The rank of a perfect matching among all perfect matchings of its ports.
///
/// Two matchings have the same index iff they contain the same unordered
/// pairs, see [`rank::rank`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Serialize, Deserialize,
)]
pub struct MatchingIndex(u128);

impl fmt::Display for MatchingIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A sequence of disjoint pairs of port indices.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Matching {
    pairs: Vec<(usize, usize)>,
}

impl Matching {
    pub fn new(pairs: Vec<(usize, usize)>) -> Self {
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn n_pairs(&self) -> usize {
        self.pairs.len()
    }

    /// The flat sequence of port indices, two per pair.
    pub fn ports(&self) -> impl Iterator<Item = usize> + '_ {
        self.pairs.iter().flat_map(|&(a, b)| [a, b])
    }

    /// The same pairs, each ordered and sorted.
    ///
    /// Two matchings with the same unordered pairs have the same normal form.
    pub fn normalized(&self) -> Self {
        let pairs = self
            .pairs
            .iter()
            .map(|&(a, b)| (a.min(b), a.max(b)))
            .sorted()
            .collect();
        Self { pairs }
    }

    /// For each of `n_ports` ports, the port it is paired with.
    pub fn partners(&self, n_ports: usize) -> Vec<Option<usize>> {
        let mut partners = vec![None; n_ports];
        for &(a, b) in &self.pairs {
            partners[a] = Some(b);
            partners[b] = Some(a);
        }
        partners
    }

    /// Whether every port of `compatibility` appears in exactly one pair and
    /// every pair is compatible.
    pub fn is_perfect(&self, compatibility: &AdjacencyMatrix) -> bool {
        let n = compatibility.size();
        if 2 * self.n_pairs() != n {
            return false;
        }
        let mut seen = vec![false; n];
        for &(a, b) in &self.pairs {
            if a >= n || b >= n || !compatibility.get(a, b) {
                return false;
            }
            for p in [a, b] {
                if std::mem::replace(&mut seen[p], true) {
                    return false;
                }
            }
        }
        true
    }

    /// The rank of this matching, see [`rank::rank`].
    pub fn index(&self) -> Result<MatchingIndex, RankError> {
        rank::rank(self)
    }
}

impl FromIterator<(usize, usize)> for Matching {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Matching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (a, b) in &self.pairs {
            write!(f, "({a} {b})")?;
        }
        Ok(())
    }
}
