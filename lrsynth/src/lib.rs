//! Lrsynth: a synthesis backend for `lrcore` that guesses instead of solving.
//!
//! [`GuessingBackend`] builds every candidate from the constraints of the lasso itself and
//! keeps those the embedded prover can verify:
//!  - ranking functions are read off the loop guards ([`termination`]);
//!  - recurrent sets are exact projections of a loop polyhedron onto its entry state,
//!    strengthened by a few backward steps ([`nontermination`]).
//!
//! Nothing it returns is trusted blindly by the analysis, but every `Sat` answer comes
//! with an argument the prover has already checked.

mod candidates;
pub mod nontermination;
pub mod termination;

pub use candidates::{BackendStatistics, GuessingBackend};
