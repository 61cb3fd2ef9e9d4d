//! Solver contexts and scoped prover sessions.
//!
//! A [`Solver`] is long-lived and shared; every query opens its own
//! [`ProverEnvironment`] with [`Solver::new_prover`], pushes formulas, checks, and
//! releases the session by dropping it.

mod fourier_motzkin;

use lrformal::prelude::{Formula, Model};
use strum::EnumIs;

use crate::utils::error::LrResult;

pub use fourier_motzkin::FourierMotzkinSolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

/// Scoped prover session. Released when dropped.
pub trait ProverEnvironment {
    /// Assert `formula` in a new scope.
    fn push(&mut self, formula: Formula) -> LrResult<()>;

    /// Remove the most recently pushed formula.
    fn pop(&mut self) -> LrResult<()>;

    /// Satisfiability of the conjunction of all pushed formulas.
    fn check(&mut self) -> LrResult<SatResult>;

    /// `true` only when the pushed formulas are proven unsatisfiable.
    fn is_unsat(&mut self) -> LrResult<bool> {
        Ok(self.check()?.is_unsat())
    }

    /// Model of the last check that returned [`SatResult::Sat`].
    fn model(&self) -> Option<&Model>;
}

/// Solver context shared by every query of an analysis.
pub trait Solver: Send + Sync {
    fn new_prover(&self) -> LrResult<Box<dyn ProverEnvironment + '_>>;

    /// Ask in-flight and future checks to stop. May be called from any thread at any
    /// time; once set, the request is never withdrawn.
    fn interrupt(&self);

    fn is_interrupted(&self) -> bool;

    /// Bring a formula built for another solver context into this one.
    fn import_formula(&self, formula: &Formula) -> Formula {
        formula.clone()
    }

    /// Release resources held by the context.
    fn close(&self) {}
}
