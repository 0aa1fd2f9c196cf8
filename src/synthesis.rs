//! The synthesis pipeline.
//!
//! Enumerate the perfect matchings of the port model, rank them, collapse
//! matchings that only differ by port swaps, check the feasibility of the
//! remaining candidates and finally deduplicate the feasible architectures
//! up to coloured isomorphism.

use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use itertools::Itertools;
use rayon::ThreadPoolBuildError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    enumerate::{enumerate, SearchTrace, Strategy},
    feasibility::{FeasibilityEvaluator, FeasibilityPredicate, FeasibleGraph, Infeasibility},
    isomorphism::{deduplicate, IsoMethod, IsomorphismOracle, OracleUnavailable},
    matching::{MatchingIndex, RankError},
    port_model::{ConfigurationError, PortModel},
    problem::Problem,
    symmetry::filter_port_symmetry,
    workers::Workers,
};

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    OracleUnavailable(#[from] OracleUnavailable),
    #[error(transparent)]
    Rank(#[from] RankError),
    #[error("could not start the worker pool: {0}")]
    WorkerPool(#[from] ThreadPoolBuildError),
}

/// How much the pipeline reports through `tracing`.
///
/// Warnings are always emitted.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Silent,
    /// A summary at the end of every run
    #[default]
    Minimal,
    /// Stage counts and search progress
    Verbose,
}

/// The options of a synthesis run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisOptions {
    /// The maximum number of matchings to enumerate
    pub max_candidates: usize,
    /// Number of worker threads; 0 and 1 both run serially
    pub parallelism: usize,
    /// Whether to apply the port-symmetry pre-filter
    pub filter: bool,
    pub iso_method: IsoMethod,
    pub verbosity: Verbosity,
    pub strategy: Strategy,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            max_candidates: 1_000_000,
            parallelism: 0,
            filter: true,
            iso_method: IsoMethod::default(),
            verbosity: Verbosity::default(),
            strategy: Strategy::default(),
        }
    }
}

/// The counts of a synthesis run at every stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Matchings enumerated
    pub matchings: usize,
    /// Whether the enumeration stopped at `max_candidates`
    pub truncated: bool,
    /// Candidates left after the port-symmetry pre-filter
    pub candidates: usize,
    pub feasible: usize,
    /// Feasible architectures left after deduplication
    pub unique: usize,
    pub infeasible: BTreeMap<Infeasibility, usize>,
    /// Search tree nodes visited
    pub nodes: u64,
    /// Search branches pruned
    pub pruned: u64,
    pub elapsed: Duration,
}

/// The result of a synthesis run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Synthesis {
    /// The feasible, pairwise non-isomorphic architectures, by matching index
    pub graphs: Vec<FeasibleGraph>,
    pub stats: RunStatistics,
}

/// Runs the synthesis pipeline on a validated problem.
pub struct Synthesizer {
    model: PortModel,
    options: SynthesisOptions,
    oracle: Option<Box<dyn IsomorphismOracle>>,
    predicate: Option<Box<dyn FeasibilityPredicate>>,
    workers: Workers,
}

impl Synthesizer {
    /// Validate `problem` and `options`.
    ///
    /// Fails before any search if the problem is malformed or the requested
    /// isomorphism oracle cannot be used.
    pub fn new(problem: &Problem, options: SynthesisOptions) -> Result<Self, SynthesisError> {
        if options.max_candidates == 0 {
            return Err(ConfigurationError::ZeroCap.into());
        }
        let model = PortModel::build(problem)?;
        let oracle = options.iso_method.resolve()?;
        let workers = Workers::new(options.parallelism)?;
        if options.verbosity >= Verbosity::Verbose {
            debug!(
                n_ports = model.n_ports(),
                threads = workers.n_threads(),
                "synthesizer ready"
            );
        }
        Ok(Self {
            model,
            options,
            oracle,
            predicate: None,
            workers,
        })
    }

    /// Add a custom feasibility rule.
    pub fn with_predicate(mut self, predicate: impl FeasibilityPredicate + 'static) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Deduplicate with `oracle` instead of the configured method.
    pub fn with_oracle(
        mut self,
        oracle: impl IsomorphismOracle + 'static,
    ) -> Result<Self, OracleUnavailable> {
        oracle.is_available()?;
        self.oracle = Some(Box::new(oracle));
        Ok(self)
    }

    pub fn model(&self) -> &PortModel {
        &self.model
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    pub fn run(&self) -> Result<Synthesis, SynthesisError> {
        self.run_traced(None)
    }

    /// Run the pipeline, instrumenting the matching search with `trace`.
    pub fn run_traced(
        &self,
        trace: Option<&mut SearchTrace<'_>>,
    ) -> Result<Synthesis, SynthesisError> {
        let start = Instant::now();
        let verbose = self.options.verbosity >= Verbosity::Verbose;

        let model = &self.model;
        let (strategy, cap) = (self.options.strategy, self.options.max_candidates);
        let enumeration = match trace {
            Some(trace) => enumerate(model, strategy, cap, Some(trace)),
            None if verbose => {
                let mut progress = SearchTrace::new()
                    .with_progress(|fraction| debug!(progress = fraction, "searching matchings"));
                enumerate(model, strategy, cap, Some(&mut progress))
            }
            None => enumerate(model, strategy, cap, None),
        };
        let mut stats = RunStatistics {
            matchings: enumeration.matchings.len(),
            truncated: enumeration.truncated,
            nodes: enumeration.stats.nodes,
            pruned: enumeration.stats.pruned,
            ..Default::default()
        };
        if verbose {
            debug!(
                matchings = stats.matchings,
                nodes = stats.nodes,
                pruned = stats.pruned,
                "enumeration done"
            );
        }

        let mut ranked: Vec<(MatchingIndex, _)> = enumeration
            .matchings
            .into_iter()
            .map(|matching| Ok((matching.index()?, matching)))
            .collect::<Result<_, RankError>>()?;
        ranked.sort_unstable_by_key(|&(index, _)| index);

        let candidates = if self.options.filter {
            let (indices, matchings) = ranked.into_iter().unzip();
            let (matchings, indices) =
                filter_port_symmetry(matchings, indices, self.model.classes());
            indices.into_iter().zip(matchings).collect_vec()
        } else {
            ranked
        };
        stats.candidates = candidates.len();
        if verbose {
            debug!(candidates = stats.candidates, "port-symmetry filter done");
        }

        let mut evaluator = FeasibilityEvaluator::new(&self.model);
        if let Some(predicate) = self.predicate.as_deref() {
            evaluator = evaluator.with_predicate(predicate);
        }
        let mut feasible = Vec::new();
        for result in evaluator.evaluate_all(&self.workers, &candidates) {
            match result {
                Ok(graph) => feasible.push(graph),
                Err(reason) => *stats.infeasible.entry(reason).or_default() += 1,
            }
        }
        stats.feasible = feasible.len();
        if verbose {
            debug!(
                feasible = stats.feasible,
                infeasible = ?stats.infeasible,
                "feasibility done"
            );
        }

        let graphs = match self.oracle.as_deref() {
            Some(oracle) => {
                let dedup = deduplicate(
                    &feasible.iter().map(|f| &f.graph).collect_vec(),
                    oracle,
                    &self.workers,
                );
                let mut retained = dedup.retained.into_iter().peekable();
                feasible
                    .into_iter()
                    .enumerate()
                    .filter(|&(i, _)| retained.next_if_eq(&i).is_some())
                    .map(|(_, graph)| graph)
                    .collect_vec()
            }
            None => {
                warn!("deduplication disabled, isomorphic architectures may remain");
                feasible
            }
        };
        stats.unique = graphs.len();
        stats.elapsed = start.elapsed();

        if self.options.verbosity >= Verbosity::Minimal {
            info!(
                matchings = stats.matchings,
                truncated = stats.truncated,
                candidates = stats.candidates,
                feasible = stats.feasible,
                unique = stats.unique,
                elapsed = ?stats.elapsed,
                "synthesis done"
            );
        }
        Ok(Synthesis { graphs, stats })
    }
}
