use itertools::Itertools;
use serde::{Deserialize, Serialize};
use union_find::{QuickUnionUf, UnionBySize, UnionFind};

use crate::{matching::Matching, port::ComponentTypeId, port_model::PortModel};

/// The component-level multigraph of a matching, coloured by component type.
///
/// Entry `(i, j)` of the weight matrix is the number of port pairs joining
/// components `i` and `j`. The diagonal counts the loops of every component,
/// i.e. pairs of two ports of the same component.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterconnectionGraph {
    colors: Vec<ComponentTypeId>,
    weights: Vec<usize>,
}

impl InterconnectionGraph {
    /// An edgeless graph on components with the given colours.
    pub fn new(colors: Vec<ComponentTypeId>) -> Self {
        let n = colors.len();
        Self {
            colors,
            weights: vec![0; n * n],
        }
    }

    /// Map every pair of `matching` to the components owning its ports.
    pub fn from_matching(model: &PortModel, matching: &Matching) -> Self {
        let mut graph = Self::new(model.colors().to_vec());
        for &(a, b) in matching.pairs() {
            graph.add_edge(model.component_of(a), model.component_of(b));
        }
        graph
    }

    /// Add one edge between `i` and `j`, or a loop if `i == j`.
    pub fn add_edge(&mut self, i: usize, j: usize) {
        let n = self.n_components();
        self.weights[i * n + j] += 1;
        if i != j {
            self.weights[j * n + i] += 1;
        }
    }

    pub fn n_components(&self) -> usize {
        self.colors.len()
    }

    /// Total number of edges, loops included.
    pub fn n_edges(&self) -> usize {
        (0..self.n_components())
            .map(|i| (i..self.n_components()).map(|j| self.weight(i, j)).sum::<usize>())
            .sum()
    }

    pub fn colors(&self) -> &[ComponentTypeId] {
        &self.colors
    }

    pub fn color(&self, i: usize) -> ComponentTypeId {
        self.colors[i]
    }

    /// The number of edges between `i` and `j`.
    pub fn weight(&self, i: usize, j: usize) -> usize {
        self.weights[i * self.n_components() + j]
    }

    pub fn loops(&self, i: usize) -> usize {
        self.weight(i, i)
    }

    /// The number of edges to other components.
    pub fn external_degree(&self, i: usize) -> usize {
        self.neighbours(i).map(|j| self.weight(i, j)).sum()
    }

    /// The number of port pairs the component takes part in.
    pub fn degree(&self, i: usize) -> usize {
        self.external_degree(i) + 2 * self.loops(i)
    }

    /// The degree in the simple graph: the number of distinct neighbours.
    pub fn simple_degree(&self, i: usize) -> usize {
        self.neighbours(i).count()
    }

    /// The other components joined to `i` by at least one edge.
    pub fn neighbours(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_components()).filter(move |&j| j != i && self.weight(i, j) > 0)
    }

    /// The weight matrix, row by row.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        self.weights
            .chunks(self.n_components().max(1))
            .map(<[usize]>::to_vec)
            .take(self.n_components())
            .collect()
    }

    /// The subgraph induced by `keep`, in the order given.
    pub fn induced(&self, keep: &[usize]) -> Self {
        let colors = keep.iter().map(|&i| self.colors[i]).collect();
        let weights = keep
            .iter()
            .cartesian_product(keep)
            .map(|(&i, &j)| self.weight(i, j))
            .collect();
        Self { colors, weights }
    }

    /// Whether every component can reach every other one.
    pub fn is_connected(&self) -> bool {
        let n = self.n_components();
        if n == 0 {
            return true;
        }
        let mut components = QuickUnionUf::<UnionBySize>::new(n);
        for i in 0..n {
            for j in self.neighbours(i).filter(|&j| j > i) {
                components.union(i, j);
            }
        }
        let root = components.find(0);
        (1..n).all(|i| components.find(i) == root)
    }

    /// A colour-respecting isomorphism invariant: the sorted sequence of
    /// (colour, external degree, loops) of the components.
    pub fn signature(&self) -> Vec<(ComponentTypeId, usize, usize)> {
        (0..self.n_components())
            .map(|i| (self.color(i), self.external_degree(i), self.loops(i)))
            .sorted_unstable()
            .collect()
    }
}
