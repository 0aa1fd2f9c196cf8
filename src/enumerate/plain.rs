use super::{SearchState, SearchStrategy};

/// Exhaustive search, without any pruning.
#[derive(Clone, Copy, Debug, Default)]
pub struct Plain;

impl SearchStrategy for Plain {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn push(&mut self, _state: &SearchState<'_>, _a: usize, _b: usize) -> bool {
        true
    }

    fn pop(&mut self, _state: &SearchState<'_>, _a: usize, _b: usize) {}
}
