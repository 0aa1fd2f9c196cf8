//! Optional instrumentation of the matching search.

/// A node of the recorded search tree: one pairing tried by the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceNode {
    /// The node of the previous pairing, `None` at the root level
    pub parent: Option<usize>,
    pub depth: usize,
    pub pair: (usize, usize),
    /// Whether the strategy cut the branch here
    pub pruned: bool,
    /// Whether this pairing completed a perfect matching
    pub complete: bool,
}

/// Records the search tree and reports the search progress.
///
/// Progress is the explored fraction of the search tree, where every node
/// splits its share evenly among its children. It is reported in whole
/// percents, strictly increasing, ending with `1.0` once the search is over.
#[derive(Default)]
pub struct SearchTrace<'a> {
    record_tree: bool,
    nodes: Vec<TraceNode>,
    progress: Option<Box<dyn FnMut(f64) + 'a>>,
    /// (children explored, number of children) of every open level
    levels: Vec<(usize, usize)>,
    reported: u32,
    finished: bool,
}

impl<'a> SearchTrace<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every node of the search tree.
    pub fn with_tree(mut self) -> Self {
        self.record_tree = true;
        self
    }

    /// Report progress to `callback`.
    pub fn with_progress(mut self, callback: impl FnMut(f64) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// The recorded search tree, in visiting order.
    pub fn nodes(&self) -> &[TraceNode] {
        &self.nodes
    }

    /// The fraction of the search tree explored so far.
    pub fn progress(&self) -> f64 {
        if self.finished {
            return 1.0;
        }
        let mut fraction = 0.;
        let mut share = 1.;
        for &(explored, n_children) in &self.levels {
            if n_children == 0 {
                break;
            }
            let child_share = share / n_children as f64;
            fraction += explored as f64 * child_share;
            share = child_share;
        }
        fraction
    }

    pub(crate) fn enter(&mut self, n_children: usize) {
        if self.progress.is_some() {
            self.levels.push((0, n_children));
        }
    }

    pub(crate) fn node(
        &mut self,
        parent: Option<usize>,
        depth: usize,
        pair: (usize, usize),
        pruned: bool,
    ) -> Option<usize> {
        if !self.record_tree {
            return None;
        }
        self.nodes.push(TraceNode {
            parent,
            depth,
            pair,
            pruned,
            complete: false,
        });
        Some(self.nodes.len() - 1)
    }

    pub(crate) fn complete(&mut self, node: Option<usize>) {
        if let Some(node) = node.and_then(|i| self.nodes.get_mut(i)) {
            node.complete = true;
        }
    }

    pub(crate) fn advance(&mut self) {
        let Some(level) = self.levels.last_mut() else {
            return;
        };
        level.0 += 1;
        let percent = (self.progress() * 100.).floor() as u32;
        if percent > self.reported && percent < 100 {
            self.reported = percent;
            if let Some(callback) = self.progress.as_mut() {
                callback(percent as f64 / 100.);
            }
        }
    }

    pub(crate) fn leave(&mut self) {
        self.levels.pop();
    }

    pub(crate) fn finish(&mut self) {
        self.levels.clear();
        if !self.finished {
            self.finished = true;
            if let Some(callback) = self.progress.as_mut() {
                callback(1.);
            }
        }
    }
}
