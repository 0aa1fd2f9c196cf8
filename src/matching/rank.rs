//! Numbering of perfect matchings.
//!
//! A perfect matching of the ports `0..n` is written in normal form: pairs
//! `(a, b)` with `a < b`, sorted by `a`. Then the first element of every pair
//! is the smallest port not yet paired, and the matching is fully described
//! by the sequence of offsets of the partners among the remaining ports.
//! With `r` ports remaining there are `r - 1` possible partners, each
//! followed by `(r - 3)!!` completions, so the offsets are the digits of a
//! mixed-radix number in `0..(n - 1)!!`. That number is the matching index.

use thiserror::Error;

use super::{Matching, MatchingIndex};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankError {
    #[error("not a perfect matching of {0} ports")]
    NotPerfect(usize),
    #[error("the matchings of {0} ports cannot be numbered in 128 bits")]
    Overflow(usize),
}

/// Number of perfect matchings of `n_ports` ports, i.e. `(n_ports - 1)!!`.
///
/// Returns `None` if `n_ports` is odd or the count does not fit in a `u128`.
pub fn perfect_matching_count(n_ports: usize) -> Option<u128> {
    if n_ports % 2 == 1 {
        return None;
    }
    (1..n_ports)
        .step_by(2)
        .try_fold(1u128, |acc, k| acc.checked_mul(k as u128))
}

/// The index of `matching` among all perfect matchings of its ports.
///
/// The ports of a matching with `k` pairs must be exactly `0..2k`. The order
/// of the pairs and of the ports within each pair is irrelevant.
pub fn rank(matching: &Matching) -> Result<MatchingIndex, RankError> {
    let n = 2 * matching.n_pairs();
    let mut remaining: Vec<usize> = (0..n).collect();
    let mut index = 0u128;
    for &(a, b) in matching.normalized().pairs() {
        if remaining.first() != Some(&a) {
            return Err(RankError::NotPerfect(n));
        }
        let offset = remaining[1..]
            .iter()
            .position(|&p| p == b)
            .ok_or(RankError::NotPerfect(n))?;
        let weight = perfect_matching_count(remaining.len() - 2).ok_or(RankError::Overflow(n))?;
        index = weight
            .checked_mul(offset as u128)
            .and_then(|digit| digit.checked_add(index))
            .ok_or(RankError::Overflow(n))?;
        remaining.remove(offset + 1);
        remaining.remove(0);
    }
    Ok(index.into())
}

/// The perfect matching of `n_ports` ports with the given index, in normal form.
pub fn unrank(index: MatchingIndex, n_ports: usize) -> Result<Matching, RankError> {
    let total = match perfect_matching_count(n_ports) {
        Some(total) => total,
        None if n_ports % 2 == 1 => return Err(RankError::NotPerfect(n_ports)),
        None => return Err(RankError::Overflow(n_ports)),
    };
    let mut rest: u128 = index.into();
    if rest >= total {
        return Err(RankError::NotPerfect(n_ports));
    }
    let mut remaining: Vec<usize> = (0..n_ports).collect();
    let mut pairs = Vec::with_capacity(n_ports / 2);
    while !remaining.is_empty() {
        // Never overflows: bounded by `total`
        let weight = perfect_matching_count(remaining.len() - 2).ok_or(RankError::Overflow(n_ports))?;
        let offset = (rest / weight) as usize;
        rest %= weight;
        let a = remaining.remove(0);
        let b = remaining.remove(offset);
        pairs.push((a, b));
    }
    Ok(Matching::new(pairs))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use itertools::Itertools;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, Some(1))]
    #[case(2, Some(1))]
    #[case(4, Some(3))]
    #[case(6, Some(15))]
    #[case(8, Some(105))]
    #[case(5, None)]
    #[case(58, None)]
    fn test_perfect_matching_count(#[case] n: usize, #[case] expected: Option<u128>) {
        assert_eq!(perfect_matching_count(n), expected);
    }

    #[rstest]
    #[case(2)]
    #[case(4)]
    #[case(6)]
    #[case(8)]
    fn test_rank_is_a_bijection(#[case] n: usize) {
        let total = perfect_matching_count(n).unwrap();
        let mut seen = BTreeSet::new();
        for i in 0..total {
            let matching = unrank(i.into(), n).unwrap();
            assert_eq!(matching.n_pairs(), n / 2);
            assert_eq!(rank(&matching).unwrap(), MatchingIndex::from(i));
            assert!(seen.insert(matching.normalized()));
        }
        assert_eq!(seen.len() as u128, total);
    }

    #[test]
    fn test_rank_ignores_order() {
        let pairs = vec![(0, 5), (1, 3), (2, 4)];
        let index = rank(&Matching::new(pairs.clone())).unwrap();
        for perm in pairs.iter().permutations(pairs.len()) {
            let swapped = perm.iter().map(|&&(a, b)| (b, a)).collect_vec();
            let as_is = perm.into_iter().copied().collect_vec();
            assert_eq!(rank(&Matching::new(as_is)).unwrap(), index);
            assert_eq!(rank(&Matching::new(swapped)).unwrap(), index);
        }
    }

    #[test]
    fn test_extreme_indices() {
        insta::assert_snapshot!(unrank(0.into(), 6).unwrap().to_string(), @"(0 1)(2 3)(4 5)");
        insta::assert_snapshot!(unrank(14.into(), 6).unwrap().to_string(), @"(0 5)(1 4)(2 3)");
        assert_eq!(unrank(15.into(), 6), Err(RankError::NotPerfect(6)));
    }

    #[rstest]
    #[case(vec![(0, 1), (1, 2)])]
    #[case(vec![(0, 1), (2, 5)])]
    #[case(vec![(0, 0), (1, 2)])]
    fn test_rank_rejects_non_perfect(#[case] pairs: Vec<(usize, usize)>) {
        assert_eq!(
            rank(&Matching::new(pairs)),
            Err(RankError::NotPerfect(4))
        );
    }

    #[test]
    fn test_largest_universe() {
        let n = crate::port_model::MAX_PORTS;
        let last = perfect_matching_count(n).unwrap() - 1;
        let matching = unrank(last.into(), n).unwrap();
        assert_eq!(rank(&matching).unwrap(), MatchingIndex::from(last));
    }
}
