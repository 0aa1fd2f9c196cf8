use std::collections::BTreeMap;

use itertools::Itertools;

use crate::feasibility::InterconnectionGraph;

use super::IsomorphismOracle;

/// Colour refinement followed by a backtracking search for a mapping.
///
/// Both graphs are refined jointly, so that equal refined colours carry the
/// same meaning in both. A colour-preserving bijection is then searched
/// among vertices of equal refined colour, rarest colours first.
#[derive(Clone, Copy, Debug, Default)]
pub struct Refinement;

/// The stable colouring of the disjoint union of `a` and `b`.
///
/// Vertices `0..a.n_components()` belong to `a`, the rest to `b`.
fn refine(a: &InterconnectionGraph, b: &InterconnectionGraph) -> Vec<usize> {
    let graphs = [a, b];
    let vertices = graphs
        .iter()
        .enumerate()
        .flat_map(|(g, graph)| (0..graph.n_components()).map(move |i| (g, i)))
        .collect_vec();
    let offsets = [0, a.n_components()];

    let relabel = |keys: Vec<Vec<usize>>| -> (Vec<usize>, usize) {
        let labels: BTreeMap<&Vec<usize>, usize> = keys
            .iter()
            .sorted()
            .dedup()
            .enumerate()
            .map(|(label, key)| (key, label))
            .collect();
        let n_labels = labels.len();
        (keys.iter().map(|key| labels[key]).collect(), n_labels)
    };

    let initial = vertices
        .iter()
        .map(|&(g, i)| vec![graphs[g].color(i).index(), graphs[g].loops(i)])
        .collect_vec();
    let (mut colours, mut n_colours) = relabel(initial);
    loop {
        let keys = vertices
            .iter()
            .map(|&(g, i)| {
                let graph = graphs[g];
                let mut key = vec![colours[offsets[g] + i]];
                let neighbourhood = graph
                    .neighbours(i)
                    .map(|j| (colours[offsets[g] + j], graph.weight(i, j)))
                    .sorted_unstable();
                key.extend(neighbourhood.flat_map(|(c, w)| [c, w]));
                key
            })
            .collect_vec();
        let (refined, n_refined) = relabel(keys);
        colours = refined;
        if n_refined == n_colours {
            return colours;
        }
        n_colours = n_refined;
    }
}

struct Mapping<'g> {
    a: &'g InterconnectionGraph,
    b: &'g InterconnectionGraph,
    /// Refined colours of `a` and of `b`
    colours_a: &'g [usize],
    colours_b: &'g [usize],
    /// Vertices of `a` in the order they are mapped
    order: Vec<usize>,
    image: Vec<Option<usize>>,
    used: Vec<bool>,
}

impl Mapping<'_> {
    fn extend(&mut self, depth: usize) -> bool {
        let Some(&u) = self.order.get(depth) else {
            return true;
        };
        for v in 0..self.b.n_components() {
            if self.used[v] || self.colours_b[v] != self.colours_a[u] || !self.is_consistent(u, v) {
                continue;
            }
            self.image[u] = Some(v);
            self.used[v] = true;
            if self.extend(depth + 1) {
                return true;
            }
            self.image[u] = None;
            self.used[v] = false;
        }
        false
    }

    /// Whether mapping `u` to `v` preserves the edges to mapped vertices.
    fn is_consistent(&self, u: usize, v: usize) -> bool {
        self.order
            .iter()
            .filter_map(|&w| Some((w, self.image[w]?)))
            .all(|(w, x)| self.a.weight(u, w) == self.b.weight(v, x))
    }
}

impl IsomorphismOracle for Refinement {
    fn name(&self) -> &str {
        "refinement"
    }

    fn are_isomorphic(&self, a: &InterconnectionGraph, b: &InterconnectionGraph) -> bool {
        if a.n_components() != b.n_components() || a.signature() != b.signature() {
            return false;
        }
        let colours = refine(a, b);
        let (colours_a, colours_b) = colours.split_at(a.n_components());
        let class_sizes = |colours: &[usize]| colours.iter().copied().counts();
        let sizes = class_sizes(colours_a);
        if sizes != class_sizes(colours_b) {
            return false;
        }
        let order = (0..a.n_components())
            .sorted_by_key(|&u| (sizes[&colours_a[u]], colours_a[u], u))
            .collect();
        let mut mapping = Mapping {
            a,
            b,
            colours_a,
            colours_b,
            order,
            image: vec![None; a.n_components()],
            used: vec![false; b.n_components()],
        };
        mapping.extend(0)
    }
}
