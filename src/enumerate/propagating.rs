use crate::port_model::PortModel;

use super::{SearchState, SearchStrategy};

/// Forward checking on the compatibility graph.
///
/// Keeps, for every port, the number of compatible ports that are still
/// unpaired. A branch is cut as soon as an unpaired port has none left.
#[derive(Clone, Debug)]
pub struct Propagating {
    options: Vec<usize>,
}

impl Propagating {
    pub fn new(model: &PortModel) -> Self {
        let compatibility = model.compatibility();
        let options = (0..model.n_ports())
            .map(|p| compatibility.neighbours(p).count())
            .collect();
        Self { options }
    }
}

impl SearchStrategy for Propagating {
    fn name(&self) -> &'static str {
        "propagating"
    }

    fn push(&mut self, state: &SearchState<'_>, a: usize, b: usize) -> bool {
        let compatibility = state.model().compatibility();
        let mut viable = true;
        for p in [a, b] {
            for u in compatibility.neighbours(p) {
                self.options[u] -= 1;
                if self.options[u] == 0 && !state.is_paired(u) {
                    viable = false;
                }
            }
        }
        viable
    }

    fn pop(&mut self, state: &SearchState<'_>, a: usize, b: usize) {
        let compatibility = state.model().compatibility();
        for p in [a, b] {
            for u in compatibility.neighbours(p) {
                self.options[u] += 1;
            }
        }
    }
}
