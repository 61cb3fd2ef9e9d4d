//! Lrcore: lasso-based termination analysis.
//!
//! Given a counterexample path that ends in a loop, this crate decides whether that loop
//! terminates, does not terminate, or cannot be classified.
//!
//! Pipeline
//!  - [`cfa`]: path positions, SSA maps and the encoding of edges into path formulas.
//!  - [`lasso`]: splits a path into stem and loop, normalizes both and builds one
//!    [`lasso::Lasso`] per feasible pair of clauses.
//!  - [`synthesis`]: what a ranking or non-termination synthesizer must provide.
//!  - [`ranking`]: ranking relations built from synthesized arguments.
//!  - [`termination`]: the [`termination::LassoAnalysis`] driving everything above.
//!
//! The embedded [`provers::FourierMotzkinSolver`] answers the feasibility queries of the
//! pipeline; [`config::TerminationConfig`] is read from TOML and
//! [`utils::shutdown::ShutdownNotifier`] stops a running analysis from another thread.

pub mod cfa;
pub mod config;
pub mod lasso;
pub mod magic;
pub mod provers;
pub mod ranking;
pub mod synthesis;
pub mod termination;
pub mod utils;
