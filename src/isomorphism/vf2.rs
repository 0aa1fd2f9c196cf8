use petgraph::{algo::is_isomorphic_matching, graph::UnGraph};

use crate::{feasibility::InterconnectionGraph, port::ComponentTypeId};

use super::IsomorphismOracle;

/// VF2 matching as implemented by `petgraph`.
///
/// Loops are folded into the vertex weight and parallel edges into the edge
/// weight, so that plain VF2 on simple graphs decides coloured multigraph
/// isomorphism.
#[derive(Clone, Copy, Debug, Default)]
pub struct Vf2;

type WeightedGraph = UnGraph<(ComponentTypeId, usize), usize>;

fn to_petgraph(graph: &InterconnectionGraph) -> WeightedGraph {
    let n = graph.n_components();
    let mut g = WeightedGraph::with_capacity(n, graph.n_edges());
    let nodes: Vec<_> = (0..n)
        .map(|i| g.add_node((graph.color(i), graph.loops(i))))
        .collect();
    for i in 0..n {
        for j in graph.neighbours(i).filter(|&j| j > i) {
            g.add_edge(nodes[i], nodes[j], graph.weight(i, j));
        }
    }
    g
}

impl IsomorphismOracle for Vf2 {
    fn name(&self) -> &str {
        "vf2"
    }

    fn are_isomorphic(&self, a: &InterconnectionGraph, b: &InterconnectionGraph) -> bool {
        if a.signature() != b.signature() {
            return false;
        }
        is_isomorphic_matching(&to_petgraph(a), &to_petgraph(b), |x, y| x == y, |x, y| x == y)
    }
}
