//! Enumeration of the perfect matchings of the port compatibility graph.
//!
//! The search is a depth-first backtracking over partial matchings: at every
//! level the lowest unpaired port is paired with each of its still unpaired
//! compatible ports in turn. A [`SearchStrategy`] observes every pairing and
//! may prune branches that cannot be completed. Strategies only ever prune
//! dead branches, so all of them produce the same set of matchings.

mod multiplicity;
mod plain;
mod propagating;
mod trace;

use std::{collections::HashMap, ops::ControlFlow};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    matching::Matching,
    port_model::{AdjacencyMatrix, PortModel},
};

pub use multiplicity::Multiplicity;
pub use plain::Plain;
pub use propagating::Propagating;
pub use trace::{SearchTrace, TraceNode};

/// Number of memoised states allowed when counting matchings up front.
const COUNT_BUDGET: usize = 1 << 16;

/// The state of the search shared with the strategies.
pub struct SearchState<'m> {
    model: &'m PortModel,
    paired: Vec<bool>,
    path: Vec<(usize, usize)>,
}

impl<'m> SearchState<'m> {
    fn new(model: &'m PortModel) -> Self {
        Self {
            model,
            paired: vec![false; model.n_ports()],
            path: Vec::with_capacity(model.n_ports() / 2),
        }
    }

    pub fn model(&self) -> &'m PortModel {
        self.model
    }

    pub fn is_paired(&self, port: usize) -> bool {
        self.paired[port]
    }

    /// The pairs chosen so far, from the root of the search tree.
    pub fn path(&self) -> &[(usize, usize)] {
        &self.path
    }

    fn is_complete(&self) -> bool {
        2 * self.path.len() == self.paired.len()
    }

    fn lowest_unpaired(&self) -> Option<usize> {
        self.paired.iter().position(|&p| !p)
    }

    fn pair(&mut self, a: usize, b: usize) {
        self.paired[a] = true;
        self.paired[b] = true;
        self.path.push((a, b));
    }

    fn unpair(&mut self, a: usize, b: usize) {
        self.paired[a] = false;
        self.paired[b] = false;
        self.path.pop();
    }
}

/// A pruning heuristic for the matching search.
pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    /// Called after `a` and `b` have been paired in `state`.
    ///
    /// Returning `false` prunes the branch. Must only return `false` if the
    /// partial matching cannot be completed.
    fn push(&mut self, state: &SearchState<'_>, a: usize, b: usize) -> bool;

    /// Undo a [`SearchStrategy::push`]. Called once for every `push`, whatever
    /// it returned, while `a` and `b` are still paired in `state`.
    fn pop(&mut self, state: &SearchState<'_>, a: usize, b: usize);
}

/// The available search strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// No pruning.
    Plain,
    /// Prune when an unpaired port runs out of partners.
    #[default]
    Propagating,
    /// Prune on port type counting bounds.
    Multiplicity,
}

impl Strategy {
    pub fn build(self, model: &PortModel) -> Box<dyn SearchStrategy> {
        match self {
            Strategy::Plain => Box::new(Plain),
            Strategy::Propagating => Box::new(Propagating::new(model)),
            Strategy::Multiplicity => Box::new(Multiplicity::new(model)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchStatistics {
    /// Number of search tree nodes (pairings) visited
    pub nodes: u64,
    /// Number of branches cut by the strategy
    pub pruned: u64,
    /// The exact number of perfect matchings, if it could be counted
    pub expected: Option<u128>,
}

/// The result of an enumeration.
#[derive(Clone, Debug, Default)]
pub struct Enumeration {
    /// The matchings found, in discovery order.
    pub matchings: Vec<Matching>,
    /// Whether more matchings exist than the cap allowed to keep.
    pub truncated: bool,
    pub stats: SearchStatistics,
}

/// Enumerate up to `cap` perfect matchings of `model`.
pub fn enumerate(
    model: &PortModel,
    strategy: Strategy,
    cap: usize,
    trace: Option<&mut SearchTrace<'_>>,
) -> Enumeration {
    let mut strategy = strategy.build(model);
    enumerate_with(model, strategy.as_mut(), cap, trace)
}

/// Enumerate up to `cap` perfect matchings of `model` using a custom strategy.
pub fn enumerate_with(
    model: &PortModel,
    strategy: &mut dyn SearchStrategy,
    cap: usize,
    trace: Option<&mut SearchTrace<'_>>,
) -> Enumeration {
    let expected = count_perfect_matchings(model.compatibility(), COUNT_BUDGET);
    // Without an exact count, start from a bounded buffer and let it grow
    let capacity = match expected {
        Some(count) => count.min(cap as u128) as usize,
        None => cap.min(COUNT_BUDGET),
    };
    debug!(
        strategy = strategy.name(),
        ?expected,
        capacity,
        "enumerating perfect matchings"
    );

    let mut search = Search {
        state: SearchState::new(model),
        strategy,
        trace,
        out: Vec::with_capacity(capacity),
        cap,
        truncated: false,
        stats: SearchStatistics {
            expected,
            ..Default::default()
        },
    };
    let flow = search.descend(None);
    if let Some(trace) = search.trace.as_deref_mut() {
        if flow.is_continue() {
            trace.finish();
        }
    }
    if search.truncated {
        warn!(cap, "matching cap reached, enumeration truncated");
    }
    Enumeration {
        matchings: search.out,
        truncated: search.truncated,
        stats: search.stats,
    }
}

struct Search<'m, 's, 't, 'p> {
    state: SearchState<'m>,
    strategy: &'s mut dyn SearchStrategy,
    trace: Option<&'t mut SearchTrace<'p>>,
    out: Vec<Matching>,
    cap: usize,
    truncated: bool,
    stats: SearchStatistics,
}

impl Search<'_, '_, '_, '_> {
    /// Explore all completions of the current partial matching.
    ///
    /// Breaks once a matching is found beyond the cap.
    fn descend(&mut self, parent: Option<usize>) -> ControlFlow<()> {
        if self.state.is_complete() {
            if self.out.len() == self.cap {
                self.truncated = true;
                return ControlFlow::Break(());
            }
            self.out.push(Matching::new(self.state.path.clone()));
            if let Some(trace) = self.trace.as_deref_mut() {
                trace.complete(parent);
            }
            return ControlFlow::Continue(());
        }
        let Some(a) = self.state.lowest_unpaired() else {
            return ControlFlow::Continue(());
        };
        let candidates: Vec<usize> = self
            .state
            .model
            .compatibility()
            .neighbours(a)
            .filter(|&b| !self.state.is_paired(b))
            .collect();
        let depth = self.state.path.len();
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.enter(candidates.len());
        }

        for b in candidates {
            self.stats.nodes += 1;
            self.state.pair(a, b);
            let viable = self.strategy.push(&self.state, a, b);
            let node = self
                .trace
                .as_deref_mut()
                .and_then(|trace| trace.node(parent, depth, (a, b), !viable));
            let flow = if viable {
                self.descend(node)
            } else {
                self.stats.pruned += 1;
                ControlFlow::Continue(())
            };
            self.strategy.pop(&self.state, a, b);
            self.state.unpair(a, b);
            if flow.is_break() {
                return flow;
            }
            if let Some(trace) = self.trace.as_deref_mut() {
                trace.advance();
            }
        }

        if let Some(trace) = self.trace.as_deref_mut() {
            trace.leave();
        }
        ControlFlow::Continue(())
    }
}

/// The exact number of perfect matchings of `compatibility`.
///
/// Returns `None` if the count needs more than `budget` memoised states or
/// does not fit in a `u128`. Supports up to 64 ports.
pub fn count_perfect_matchings(compatibility: &AdjacencyMatrix, budget: usize) -> Option<u128> {
    let n = compatibility.size();
    if n > 64 || n % 2 == 1 {
        return None;
    }
    let all = if n == 64 { u64::MAX } else { (1u64 << n) - 1 };
    let mut memo = HashMap::new();
    count_from(all, compatibility, &mut memo, budget)
}

fn count_from(
    unpaired: u64,
    compatibility: &AdjacencyMatrix,
    memo: &mut HashMap<u64, u128>,
    budget: usize,
) -> Option<u128> {
    if unpaired == 0 {
        return Some(1);
    }
    if let Some(&count) = memo.get(&unpaired) {
        return Some(count);
    }
    if memo.len() >= budget {
        return None;
    }
    let a = unpaired.trailing_zeros() as usize;
    let rest = unpaired & !(1u64 << a);
    let mut total = 0u128;
    for b in compatibility.neighbours(a) {
        if rest & (1u64 << b) == 0 {
            continue;
        }
        let count = count_from(rest & !(1u64 << b), compatibility, memo, budget)?;
        total = total.checked_add(count)?;
    }
    memo.insert(unpaired, total);
    Some(total)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use itertools::Itertools;
    use rstest::rstest;

    use crate::port_model::tests::{hub_leaf_spare, triangle};
    use crate::problem::{ComponentType, Problem};

    use super::*;

    fn normalized_set(enumeration: &Enumeration) -> BTreeSet<Matching> {
        enumeration
            .matchings
            .iter()
            .map(|m| m.normalized())
            .collect()
    }

    /// Two port types that only mate with each other, plus a free one.
    fn mixed() -> Problem {
        Problem::new()
            .port_type("a")
            .port_type("b")
            .port_type("c")
            .component(ComponentType::new("x").port("a", 2).port("c", 1).instances(2))
            .component(ComponentType::new("y").port("b", 1).port("c", 1).instances(2))
            .compatible("a", "b")
            .compatible("c", "c")
            .compatible("a", "c")
    }

    #[rstest]
    fn test_triangle_matchings(triangle: Problem) {
        let model = PortModel::build(&triangle).unwrap();
        let enumeration = enumerate(&model, Strategy::Plain, usize::MAX, None);
        assert_eq!(enumeration.matchings.len(), 8);
        assert!(!enumeration.truncated);
        assert_eq!(enumeration.stats.expected, Some(8));
        for m in &enumeration.matchings {
            assert!(m.is_perfect(model.compatibility()));
        }
        assert_eq!(normalized_set(&enumeration).len(), 8);
    }

    #[rstest]
    #[case::plain(Strategy::Plain)]
    #[case::propagating(Strategy::Propagating)]
    #[case::multiplicity(Strategy::Multiplicity)]
    fn test_strategies_agree(#[case] strategy: Strategy) {
        for problem in [mixed(), triangle(), hub_leaf_spare()] {
            let model = PortModel::build(&problem).unwrap();
            let reference = enumerate(&model, Strategy::Plain, usize::MAX, None);
            let enumeration = enumerate(&model, strategy, usize::MAX, None);
            assert_eq!(normalized_set(&enumeration), normalized_set(&reference));
            assert_eq!(
                enumeration.matchings.len() as u128,
                enumeration.stats.expected.unwrap()
            );
            assert!(enumeration.stats.nodes <= reference.stats.nodes);
        }
    }

    #[rstest]
    #[case::propagating(Strategy::Propagating)]
    #[case::multiplicity(Strategy::Multiplicity)]
    fn test_pruning_cuts_dead_branches(#[case] strategy: Strategy) {
        // Pairing the two `a` ports leaves both `b` ports stranded
        let problem = Problem::new()
            .port_type("a")
            .port_type("b")
            .component(ComponentType::new("x").port("a", 1).instances(2))
            .component(ComponentType::new("y").port("b", 1).instances(2))
            .compatible("a", "a")
            .compatible("a", "b");
        let model = PortModel::build(&problem).unwrap();
        let plain = enumerate(&model, Strategy::Plain, usize::MAX, None);
        let pruned = enumerate(&model, strategy, usize::MAX, None);
        assert_eq!(plain.stats.pruned, 0);
        assert_eq!(pruned.stats.pruned, 1);
        assert_eq!(pruned.matchings.len(), 2);
        assert_eq!(normalized_set(&pruned), normalized_set(&plain));
    }

    #[rstest]
    fn test_cap_truncates(triangle: Problem) {
        let model = PortModel::build(&triangle).unwrap();
        let enumeration = enumerate(&model, Strategy::Propagating, 5, None);
        assert_eq!(enumeration.matchings.len(), 5);
        assert!(enumeration.truncated);
    }

    #[rstest]
    fn test_cap_at_exact_count_is_not_truncated(triangle: Problem) {
        let model = PortModel::build(&triangle).unwrap();
        let enumeration = enumerate(&model, Strategy::Plain, 8, None);
        assert_eq!(enumeration.matchings.len(), 8);
        assert!(!enumeration.truncated);
    }

    #[test]
    fn test_no_matching() {
        let problem = Problem::new()
            .port_type("a")
            .port_type("b")
            .component(ComponentType::new("x").port("a", 2))
            .compatible("a", "b");
        let model = PortModel::build(&problem).unwrap();
        for strategy in [Strategy::Plain, Strategy::Propagating, Strategy::Multiplicity] {
            let enumeration = enumerate(&model, strategy, usize::MAX, None);
            assert!(enumeration.matchings.is_empty());
            assert_eq!(enumeration.stats.expected, Some(0));
        }
    }

    #[rstest]
    fn test_trace_records_tree_and_progress(triangle: Problem) {
        let model = PortModel::build(&triangle).unwrap();
        let mut reports = Vec::new();
        let n_nodes;
        {
            let mut trace = SearchTrace::new()
                .with_tree()
                .with_progress(|fraction| reports.push(fraction));
            let enumeration = enumerate(&model, Strategy::Plain, usize::MAX, Some(&mut trace));
            n_nodes = enumeration.stats.nodes as usize;
            assert_eq!(trace.nodes().len(), n_nodes);
            let complete = trace.nodes().iter().filter(|n| n.complete).count();
            assert_eq!(complete, enumeration.matchings.len());
            assert!(trace.nodes().iter().all(|n| n.parent.map_or(n.depth == 0, |p| p < n_nodes)));
        }
        assert!(n_nodes > 0);
        assert!(reports.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(reports.last().copied(), Some(1.0));
    }

    #[rstest]
    fn test_trace_does_not_change_result(triangle: Problem) {
        let model = PortModel::build(&triangle).unwrap();
        let mut trace = SearchTrace::new().with_progress(|_| {});
        let traced = enumerate(&model, Strategy::Propagating, usize::MAX, Some(&mut trace));
        let untraced = enumerate(&model, Strategy::Propagating, usize::MAX, None);
        assert_eq!(traced.matchings, untraced.matchings);
    }

    #[test]
    fn test_buffer_is_bounded_without_exact_count() {
        // 26 mutually compatible ports exhaust the counting budget, and the
        // two `z` ports have no partner at all
        let problem = Problem::new()
            .port_type("a")
            .port_type("z")
            .component(ComponentType::new("x").port("a", 2).instances(13))
            .component(ComponentType::new("w").port("z", 2))
            .compatible("a", "a");
        let model = PortModel::build(&problem).unwrap();
        let enumeration = enumerate(&model, Strategy::Multiplicity, 1_000_000, None);
        assert_eq!(enumeration.stats.expected, None);
        assert!(enumeration.matchings.is_empty());
        assert!(enumeration.matchings.capacity() < 1_000_000);
    }

    #[test]
    fn test_count_gives_up_beyond_budget() {
        let mut a = AdjacencyMatrix::new(12);
        for (i, j) in (0..12).tuple_combinations() {
            a.set(i, j);
        }
        assert_eq!(count_perfect_matchings(&a, usize::MAX), Some(10395));
        assert_eq!(count_perfect_matchings(&a, 4), None);
    }
}
