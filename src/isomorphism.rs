//! Deduplication of architectures up to coloured isomorphism.
//!
//! Two architectures are duplicates if some bijection of their components
//! preserves component types, loops and edge multiplicities. Deciding this
//! is left to an [`IsomorphismOracle`]. Only graphs with equal
//! [signatures](InterconnectionGraph::signature) are ever compared.

mod refine;
#[cfg(feature = "vf2")]
mod vf2;

use std::{borrow::Borrow, collections::BTreeMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use union_find::{QuickUnionUf, UnionBySize, UnionFind};

use crate::{feasibility::InterconnectionGraph, workers::Workers};

pub use refine::Refinement;
#[cfg(feature = "vf2")]
pub use vf2::Vf2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("isomorphism oracle unavailable: {0}")]
pub struct OracleUnavailable(pub String);

/// Decides whether two coloured interconnection graphs are isomorphic.
pub trait IsomorphismOracle: Send + Sync {
    fn name(&self) -> &str;

    /// Checked once before any search starts.
    fn is_available(&self) -> Result<(), OracleUnavailable> {
        Ok(())
    }

    /// Must only map components of the same type onto each other.
    fn are_isomorphic(&self, a: &InterconnectionGraph, b: &InterconnectionGraph) -> bool;
}

/// The built-in deduplication methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsoMethod {
    /// VF2, from `petgraph`. Requires the `vf2` feature.
    Vf2,
    /// The built-in colour refinement search.
    #[default]
    Refinement,
    /// Do not deduplicate.
    None,
}

impl IsoMethod {
    /// The oracle of this method, `None` if no deduplication is requested.
    pub fn resolve(self) -> Result<Option<Box<dyn IsomorphismOracle>>, OracleUnavailable> {
        let oracle: Box<dyn IsomorphismOracle> = match self {
            IsoMethod::None => return Ok(None),
            IsoMethod::Refinement => Box::new(Refinement),
            #[cfg(feature = "vf2")]
            IsoMethod::Vf2 => Box::new(Vf2),
            #[cfg(not(feature = "vf2"))]
            IsoMethod::Vf2 => {
                return Err(OracleUnavailable(
                    "vf2 requires the `vf2` feature".to_string(),
                ))
            }
        };
        oracle.is_available()?;
        Ok(Some(oracle))
    }
}

/// The result of a deduplication.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deduplication {
    /// Position of the representative of every class, increasing
    pub retained: Vec<usize>,
    /// The members of every class, aligned with `retained`
    pub classes: Vec<Vec<usize>>,
}

/// Partition `graphs` into isomorphism classes.
///
/// The representative of a class is its first member. Buckets of graphs
/// sharing a signature are compared independently on `workers`; the classes
/// are merged afterwards.
pub fn deduplicate<G>(
    graphs: &[G],
    oracle: &dyn IsomorphismOracle,
    workers: &Workers,
) -> Deduplication
where
    G: Borrow<InterconnectionGraph> + Sync,
{
    let mut buckets: BTreeMap<_, Vec<usize>> = BTreeMap::new();
    for (i, graph) in graphs.iter().enumerate() {
        buckets.entry(graph.borrow().signature()).or_default().push(i);
    }
    let buckets: Vec<Vec<usize>> = buckets.into_values().collect();

    // Every graph is linked to the first earlier graph it is isomorphic to
    let links = workers.map(&buckets, |bucket| {
        let mut representatives: Vec<usize> = Vec::new();
        let mut links = Vec::new();
        for &i in bucket {
            let graph = graphs[i].borrow();
            match representatives
                .iter()
                .find(|&&r| oracle.are_isomorphic(graphs[r].borrow(), graph))
            {
                Some(&r) => links.push((r, i)),
                None => representatives.push(i),
            }
        }
        links
    });

    let mut classes_uf = QuickUnionUf::<UnionBySize>::new(graphs.len());
    for &(r, i) in links.iter().flatten() {
        classes_uf.union(r, i);
    }
    let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..graphs.len() {
        classes.entry(classes_uf.find(i)).or_default().push(i);
    }
    let mut classes: Vec<Vec<usize>> = classes.into_values().collect();
    classes.sort_unstable_by_key(|class| class[0]);
    Deduplication {
        retained: classes.iter().map(|class| class[0]).collect(),
        classes,
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use rstest::rstest;

    use crate::port::ComponentTypeId;

    use super::*;

    fn graph(colors: &[usize], edges: &[(usize, usize)]) -> InterconnectionGraph {
        let mut g = InterconnectionGraph::new(colors.iter().map(|&c| c.into()).collect());
        for &(i, j) in edges {
            g.add_edge(i, j);
        }
        g
    }

    /// Small graphs with lots of near misses.
    fn zoo() -> Vec<InterconnectionGraph> {
        vec![
            graph(&[0, 0, 0, 0], &[(0, 1), (1, 2), (2, 3), (3, 0)]),
            graph(&[0, 0, 0, 0], &[(0, 2), (2, 1), (1, 3), (3, 0)]),
            graph(&[0, 0, 0, 0], &[(0, 1), (0, 1), (2, 3), (2, 3)]),
            graph(&[0, 0, 0, 0], &[(0, 3), (0, 3), (1, 2), (1, 2)]),
            graph(&[0, 1, 0, 1], &[(0, 1), (1, 2), (2, 3), (3, 0)]),
            graph(&[0, 0, 1, 1], &[(0, 1), (1, 2), (2, 3), (3, 0)]),
            graph(&[1, 0, 1, 0], &[(1, 2), (2, 3), (3, 0), (0, 1)]),
            graph(&[0, 0, 0], &[(0, 1), (1, 2), (2, 2)]),
            graph(&[0, 0, 0], &[(0, 1), (1, 2), (0, 0)]),
            graph(&[0, 0, 0], &[(0, 1), (1, 2), (1, 1)]),
            // Same degree sequence, different structure: two triangles vs a hexagon
            graph(&[0; 6], &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)]),
            graph(&[0; 6], &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0)]),
        ]
    }

    fn oracles() -> Vec<Box<dyn IsomorphismOracle>> {
        let mut oracles: Vec<Box<dyn IsomorphismOracle>> = vec![Box::new(Refinement)];
        #[cfg(feature = "vf2")]
        oracles.push(Box::new(Vf2));
        oracles
    }

    #[test]
    fn test_refinement_decisions() {
        let zoo = zoo();
        let iso = |i: usize, j: usize| Refinement.are_isomorphic(&zoo[i], &zoo[j]);
        assert!(iso(0, 1));
        assert!(iso(2, 3));
        assert!(!iso(0, 2));
        assert!(iso(4, 6));
        assert!(!iso(4, 5));
        assert!(iso(7, 8));
        assert!(!iso(7, 9));
        assert!(!iso(10, 11));
    }

    #[cfg(feature = "vf2")]
    #[test]
    fn test_oracles_agree() {
        let zoo = zoo();
        for (a, b) in zoo.iter().cartesian_product(&zoo) {
            assert_eq!(
                Refinement.are_isomorphic(a, b),
                Vf2.are_isomorphic(a, b),
                "{a:?} vs {b:?}"
            );
        }
    }

    #[test]
    fn test_colours_are_respected() {
        let a = graph(&[0, 1], &[(0, 1), (0, 0)]);
        let b = graph(&[0, 1], &[(0, 1), (1, 1)]);
        for oracle in oracles() {
            assert!(!oracle.are_isomorphic(&a, &b), "{}", oracle.name());
            assert!(oracle.are_isomorphic(&a, &a.induced(&[0, 1])));
        }
        assert_eq!(a.color(1), ComponentTypeId::from(1));
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    fn test_deduplication_is_a_partition(#[case] parallelism: usize) {
        let zoo = zoo();
        let workers = Workers::new(parallelism).unwrap();
        for oracle in oracles() {
            let dedup = deduplicate(&zoo, oracle.as_ref(), &workers);
            assert_eq!(dedup.retained, vec![0, 2, 4, 5, 7, 9, 10, 11]);
            for (&r, s) in dedup.retained.iter().tuple_combinations() {
                assert!(!oracle.are_isomorphic(&zoo[r], &zoo[*s]));
            }
            let members = dedup.classes.iter().flatten().sorted().copied().collect_vec();
            assert_eq!(members, (0..zoo.len()).collect_vec());
            for (&r, class) in dedup.retained.iter().zip(&dedup.classes) {
                assert_eq!(class[0], r);
                assert!(class.iter().all(|&i| oracle.are_isomorphic(&zoo[r], &zoo[i])));
            }
        }
    }

    #[test]
    fn test_resolve() {
        assert!(IsoMethod::None.resolve().unwrap().is_none());
        let oracle = IsoMethod::Refinement.resolve().unwrap().unwrap();
        assert_eq!(oracle.name(), "refinement");
        #[cfg(feature = "vf2")]
        assert_eq!(IsoMethod::Vf2.resolve().unwrap().unwrap().name(), "vf2");
        #[cfg(not(feature = "vf2"))]
        assert!(IsoMethod::Vf2.resolve().is_err());
    }
}
