use crate::port_model::{AdjacencyMatrix, PortModel};

use super::{SearchState, SearchStrategy};

/// Counting bounds on the unpaired ports of every port type.
///
/// A port type that cannot mate with itself needs at least as many unpaired
/// partner ports of other types as it has unpaired ports. A port type that
/// can only mate with itself needs an even number of unpaired ports.
#[derive(Clone, Debug)]
pub struct Multiplicity {
    kinds: Vec<usize>,
    remaining: Vec<usize>,
    reduced: AdjacencyMatrix,
}

impl Multiplicity {
    pub fn new(model: &PortModel) -> Self {
        let kinds: Vec<usize> = model.ports().iter().map(|p| p.kind.index()).collect();
        let mut remaining = vec![0; model.n_port_types()];
        for &kind in &kinds {
            remaining[kind] += 1;
        }
        Self {
            kinds,
            remaining,
            reduced: model.type_compatibility().clone(),
        }
    }

    fn is_viable(&self) -> bool {
        (0..self.remaining.len()).all(|t| {
            let count = self.remaining[t];
            if count == 0 {
                return true;
            }
            let others: usize = self
                .reduced
                .neighbours(t)
                .filter(|&s| s != t)
                .map(|s| self.remaining[s])
                .sum();
            if self.reduced.get(t, t) {
                others > 0 || count % 2 == 0
            } else {
                count <= others
            }
        })
    }
}

impl SearchStrategy for Multiplicity {
    fn name(&self) -> &'static str {
        "multiplicity"
    }

    fn push(&mut self, _state: &SearchState<'_>, a: usize, b: usize) -> bool {
        self.remaining[self.kinds[a]] -= 1;
        self.remaining[self.kinds[b]] -= 1;
        self.is_viable()
    }

    fn pop(&mut self, _state: &SearchState<'_>, a: usize, b: usize) {
        self.remaining[self.kinds[a]] += 1;
        self.remaining[self.kinds[b]] += 1;
    }
}
