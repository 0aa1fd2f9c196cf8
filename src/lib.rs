//! Architecture synthesis by enumeration of port matchings.
//!
//! A [`Problem`] lists component types with typed ports, which port types
//! may be connected, and the structural rules every architecture must obey.
//! Every way of pairing all ports up is a candidate architecture. The
//! [`Synthesizer`] enumerates these pairings, drops the ones that break a
//! rule and returns one architecture per class of coloured isomorphism.
//!
//! ```
//! use archsynth::{ComponentType, Problem, SynthesisOptions, Synthesizer};
//!
//! let problem = Problem::new()
//!     .port_type("p")
//!     .component(ComponentType::new("node").port("p", 2).instances(3))
//!     .compatible("p", "p");
//! let synthesis = Synthesizer::new(&problem, SynthesisOptions::default())?.run()?;
//! assert_eq!(synthesis.graphs.len(), 1);
//! # Ok::<(), archsynth::SynthesisError>(())
//! ```

pub mod enumerate;
pub mod feasibility;
pub mod isomorphism;
pub mod matching;
pub mod port;
pub mod port_model;
pub mod problem;
pub mod symmetry;
pub mod synthesis;
pub mod workers;

pub use feasibility::{Candidate, FeasibleGraph, Infeasibility, InterconnectionGraph};
pub use isomorphism::{IsoMethod, IsomorphismOracle, OracleUnavailable};
pub use matching::{Matching, MatchingIndex};
pub use port_model::{ConfigurationError, PortModel};
pub use problem::{ComponentType, ConnectionCount, LineRule, Problem};
pub use synthesis::{
    RunStatistics, Synthesis, SynthesisError, SynthesisOptions, Synthesizer, Verbosity,
};
