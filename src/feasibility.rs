//! Feasibility of candidate architectures.
//!
//! Every matching is mapped to its component-level [`InterconnectionGraph`]
//! and run through a fixed sequence of checks, stopping at the first one
//! that fails:
//!
//! 1. stranded components (no edge to another component) are removed if
//!    optional; a stranded mandatory component is infeasible, and so is an
//!    architecture with no component left;
//! 2. connection counts of the remaining components;
//! 3. line connectivity, if line constraints were declared;
//! 4. global connectivity, if required;
//! 5. the custom predicate, if any.
//!
//! Candidates are independent of each other and are evaluated on [`Workers`].

mod graph;
pub mod lines;

use std::collections::BTreeMap;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{
    matching::{Matching, MatchingIndex},
    port_model::PortModel,
    problem::ConnectionCount,
    workers::Workers,
};

pub use graph::InterconnectionGraph;

/// Free-form metadata attached to a feasible architecture by a predicate.
pub type Annotations = BTreeMap<String, serde_json::Value>;

/// Why a candidate was rejected.
#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Infeasibility {
    #[display(fmt = "no component left")]
    Empty,
    #[display(fmt = "mandatory component left unconnected")]
    StrandedMandatory,
    #[display(fmt = "wrong number of connections")]
    ConnectionCount,
    #[display(fmt = "line constraint violated")]
    LineConnectivity,
    #[display(fmt = "disconnected")]
    Disconnected,
    #[display(fmt = "rejected by predicate")]
    Rejected,
}

/// A candidate that passed all built-in checks, as seen by a predicate.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
    pub model: &'a PortModel,
    pub index: MatchingIndex,
    pub matching: &'a Matching,
    /// The graph after stranded components were removed
    pub graph: &'a InterconnectionGraph,
    /// The component instance of every vertex of `graph`
    pub components: &'a [usize],
    /// The component instances that were removed
    pub removed: &'a [usize],
}

/// A custom feasibility rule.
///
/// Only ever called on candidates that passed all other checks. Returning
/// `false` rejects the candidate; `annotations` are kept with the feasible
/// architecture otherwise.
pub trait FeasibilityPredicate: Send + Sync {
    fn check(&self, candidate: &Candidate<'_>, annotations: &mut Annotations) -> bool;
}

impl<F> FeasibilityPredicate for F
where
    F: Fn(&Candidate<'_>, &mut Annotations) -> bool + Send + Sync,
{
    fn check(&self, candidate: &Candidate<'_>, annotations: &mut Annotations) -> bool {
        self(candidate, annotations)
    }
}

/// A feasible architecture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeasibleGraph {
    /// The index of the originating matching
    pub index: MatchingIndex,
    pub matching: Matching,
    /// The architecture, stranded components removed
    pub graph: InterconnectionGraph,
    /// The component type name of every vertex of `graph`
    pub labels: Vec<String>,
    /// The component instance of every vertex of `graph`
    pub components: Vec<usize>,
    /// The stranded component instances that were removed
    pub removed: Vec<usize>,
    #[serde(default)]
    pub annotations: Annotations,
}

/// Runs the feasibility checks of a port model.
#[derive(Clone, Copy)]
pub struct FeasibilityEvaluator<'a> {
    model: &'a PortModel,
    predicate: Option<&'a dyn FeasibilityPredicate>,
}

impl<'a> FeasibilityEvaluator<'a> {
    pub fn new(model: &'a PortModel) -> Self {
        Self {
            model,
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, predicate: &'a dyn FeasibilityPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Evaluate the matching with the given index.
    pub fn evaluate(
        &self,
        index: MatchingIndex,
        matching: &Matching,
    ) -> Result<FeasibleGraph, Infeasibility> {
        let model = self.model;
        let full = InterconnectionGraph::from_matching(model, matching);

        let mut components = Vec::with_capacity(full.n_components());
        let mut removed = Vec::new();
        for c in 0..full.n_components() {
            if full.external_degree(c) > 0 {
                components.push(c);
            } else if model.type_of(c).mandatory {
                return Err(Infeasibility::StrandedMandatory);
            } else {
                removed.push(c);
            }
        }
        if components.is_empty() {
            return Err(Infeasibility::Empty);
        }
        let graph = if removed.is_empty() {
            full
        } else {
            full.induced(&components)
        };

        if model.has_connection_constraints() {
            let counts_match = components.iter().enumerate().all(|(v, &c)| {
                let ctype = model.type_of(c);
                match ctype.connections {
                    ConnectionCount::Any => true,
                    ConnectionCount::Unique => graph.simple_degree(v) == ctype.n_ports(),
                    ConnectionCount::Exact(n) => graph.simple_degree(v) == n,
                }
            });
            if !counts_match {
                return Err(Infeasibility::ConnectionCount);
            }
        }

        if let Some(line_rules) = model.lines() {
            let partners = matching.partners(model.n_ports());
            if !lines::satisfies(model, line_rules, &partners) {
                return Err(Infeasibility::LineConnectivity);
            }
        }

        if model.requires_connected() && !graph.is_connected() {
            return Err(Infeasibility::Disconnected);
        }

        let mut annotations = Annotations::new();
        if let Some(predicate) = self.predicate {
            let candidate = Candidate {
                model,
                index,
                matching,
                graph: &graph,
                components: &components,
                removed: &removed,
            };
            if !predicate.check(&candidate, &mut annotations) {
                return Err(Infeasibility::Rejected);
            }
        }

        let labels = components
            .iter()
            .map(|&c| model.type_of(c).name.clone())
            .collect();
        Ok(FeasibleGraph {
            index,
            matching: matching.clone(),
            graph,
            labels,
            components,
            removed,
            annotations,
        })
    }

    /// Evaluate all `candidates`, in order, on `workers`.
    pub fn evaluate_all(
        &self,
        workers: &Workers,
        candidates: &[(MatchingIndex, Matching)],
    ) -> Vec<Result<FeasibleGraph, Infeasibility>> {
        workers.map(candidates, |(index, matching)| self.evaluate(*index, matching))
    }
}
