use std::sync::atomic::{AtomicBool, Ordering};

use log::trace;
use lrformal::{
    linear::{Feasibility, FourierMotzkin, Polyhedron},
    normalize::{DEFAULT_MAX_DNF_CLAUSES, FormulaNormalizer},
    prelude::{Formula, Model},
};
use num_bigint::BigInt;
use num_traits::Zero;

use crate::{
    config::TerminationConfig,
    provers::{ProverEnvironment, SatResult, Solver},
    utils::error::{LrError, LrResult},
};

/// Embedded decision procedure for quantifier-free linear integer arithmetic.
///
/// A check normalizes the pushed conjunction into clauses and runs Fourier-Motzkin
/// elimination on each. The answer is `Unsat` only when every clause is refuted and
/// `Sat` only with a verified integer model; non-linear clauses and inconclusive
/// eliminations yield `Unknown`.
#[derive(Debug)]
pub struct FourierMotzkinSolver {
    interrupted: AtomicBool,
    max_dnf_clauses: usize,
    engine: FourierMotzkin,
}

impl Default for FourierMotzkinSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FourierMotzkinSolver {
    pub fn new() -> Self {
        Self {
            interrupted: AtomicBool::new(false),
            max_dnf_clauses: DEFAULT_MAX_DNF_CLAUSES,
            engine: FourierMotzkin::new(),
        }
    }

    /// Solver whose normalizer uses the clause bound of `config`.
    pub fn from_config(config: &TerminationConfig) -> Self {
        Self::new().with_max_dnf_clauses(config.max_dnf_clauses)
    }

    /// Clause bound of this solver's own normalizer. It is independent of the bound
    /// [`crate::termination::LassoAnalysis`] hands to the lasso builder.
    pub fn with_max_dnf_clauses(mut self, max_dnf_clauses: usize) -> Self {
        self.max_dnf_clauses = max_dnf_clauses;
        self
    }

    pub fn with_max_combinations(mut self, max_combinations: usize) -> Self {
        self.engine = self.engine.with_max_combinations(max_combinations);
        self
    }

    fn interruption() -> LrError {
        LrError::Interrupted("solver interrupted".to_string())
    }
}

impl Solver for FourierMotzkinSolver {
    fn new_prover(&self) -> LrResult<Box<dyn ProverEnvironment + '_>> {
        if self.is_interrupted() {
            return Err(Self::interruption());
        }
        trace!("opening prover session");
        Ok(Box::new(FourierMotzkinProver {
            solver: self,
            stack: Vec::new(),
            model: None,
        }))
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }
}

enum ClauseOutcome {
    Refuted,
    Satisfied(Model),
    Undecided,
}

struct FourierMotzkinProver<'a> {
    solver: &'a FourierMotzkinSolver,
    stack: Vec<Formula>,
    model: Option<Model>,
}

impl FourierMotzkinProver<'_> {
    fn check_clause(&self, clause: &Formula) -> LrResult<ClauseOutcome> {
        let Ok(polyhedron) = Polyhedron::from_clause(clause) else {
            trace!("cannot decide non-linear clause {clause}");
            return Ok(ClauseOutcome::Undecided);
        };
        let interrupted = || self.solver.is_interrupted();
        match self
            .solver
            .engine
            .check_interruptible(polyhedron.constraints(), &interrupted)
        {
            Feasibility::Infeasible => Ok(ClauseOutcome::Refuted),
            Feasibility::Feasible(mut model) => {
                for variable in clause.variables() {
                    model.entry(variable).or_insert_with(BigInt::zero);
                }
                Ok(ClauseOutcome::Satisfied(model))
            }
            Feasibility::Unknown => Ok(ClauseOutcome::Undecided),
            Feasibility::Interrupted => Err(FourierMotzkinSolver::interruption()),
        }
    }
}

impl ProverEnvironment for FourierMotzkinProver<'_> {
    fn push(&mut self, formula: Formula) -> LrResult<()> {
        self.stack.push(formula);
        Ok(())
    }

    fn pop(&mut self) -> LrResult<()> {
        self.stack
            .pop()
            .map(|_| ())
            .ok_or_else(|| LrError::Solver("pop on an empty prover stack".to_string()))
    }

    fn check(&mut self) -> LrResult<SatResult> {
        self.model = None;
        if self.solver.is_interrupted() {
            return Err(FourierMotzkinSolver::interruption());
        }

        let conjunction = Formula::and(self.stack.iter().cloned());
        let mut normalizer =
            FormulaNormalizer::new().with_max_dnf_clauses(self.solver.max_dnf_clauses);
        let clauses = normalizer.normalize(&conjunction);

        let mut refuted_all = true;
        for clause in &clauses {
            match self.check_clause(clause)? {
                ClauseOutcome::Refuted => {}
                ClauseOutcome::Satisfied(model) => {
                    self.model = Some(model);
                    return Ok(SatResult::Sat);
                }
                ClauseOutcome::Undecided => refuted_all = false,
            }
        }

        Ok(if refuted_all {
            SatResult::Unsat
        } else {
            SatResult::Unknown
        })
    }

    fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }
}

impl Drop for FourierMotzkinProver<'_> {
    fn drop(&mut self) {
        trace!("releasing prover session ({} formulas)", self.stack.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrformal::prelude::*;

    fn x() -> Term {
        Term::var("x")
    }

    fn y() -> Term {
        Term::var("y")
    }

    #[test]
    fn clause_bound_follows_the_config() {
        let mut config = TerminationConfig::default();
        config.max_dnf_clauses = 8;
        assert_eq!(FourierMotzkinSolver::from_config(&config).max_dnf_clauses, 8);
        assert_eq!(
            FourierMotzkinSolver::new().max_dnf_clauses,
            DEFAULT_MAX_DNF_CLAUSES
        );
    }

    #[test]
    fn unconstrained_equalities_are_satisfiable() {
        let solver = FourierMotzkinSolver::new();
        let mut prover = solver.new_prover().unwrap();
        prover.push(eq(Term::Var(Variable::indexed("__nondet", 2)), x())).unwrap();
        prover.push(eq(y(), x() + 1)).unwrap();
        assert_eq!(prover.check().unwrap(), SatResult::Sat);
        let model = prover.model().unwrap();
        let x = &model[&Variable::new("x")];
        assert_eq!(model[&Variable::new("y")], x + BigInt::from(1));
    }

    #[test]
    fn unsat_requires_every_clause_refuted() {
        let solver = FourierMotzkinSolver::new();
        let mut prover = solver.new_prover().unwrap();
        prover.push(gt(x(), 0) & lt(x(), 0)).unwrap();
        assert_eq!(prover.check().unwrap(), SatResult::Unsat);

        let mut prover = solver.new_prover().unwrap();
        prover.push((gt(x(), 0) & lt(x(), 0)) | eq(x(), 3)).unwrap();
        assert_eq!(prover.check().unwrap(), SatResult::Sat);
        let model = prover.model().unwrap();
        assert_eq!(model.get(&Variable::new("x")), Some(&BigInt::from(3)));
    }

    #[test]
    fn push_and_pop_scope_assertions() {
        let solver = FourierMotzkinSolver::new();
        let mut prover = solver.new_prover().unwrap();
        prover.push(ge(x(), y() + 1)).unwrap();
        prover.push(le(x(), y())).unwrap();
        assert!(prover.is_unsat().unwrap());
        prover.pop().unwrap();
        assert!(prover.check().unwrap().is_sat());
        prover.pop().unwrap();
        assert!(prover.pop().is_err());
    }

    #[test]
    fn non_linear_clauses_are_unknown() {
        let solver = FourierMotzkinSolver::new();
        let mut prover = solver.new_prover().unwrap();
        prover.push(eq(x() * y(), 7) & lt(x(), 0) & gt(x(), 0)).unwrap();
        assert_eq!(prover.check().unwrap(), SatResult::Unknown);
        assert!(prover.model().is_none());
    }

    #[test]
    fn division_and_remainder_are_decided() {
        let solver = FourierMotzkinSolver::new();

        let mut prover = solver.new_prover().unwrap();
        prover.push(gt(x().div(2), x()) & ge(x(), 0)).unwrap();
        assert_eq!(prover.check().unwrap(), SatResult::Unsat);

        let mut prover = solver.new_prover().unwrap();
        prover.push(eq(x().modulo(3), 5)).unwrap();
        assert_eq!(prover.check().unwrap(), SatResult::Unsat);

        let mut prover = solver.new_prover().unwrap();
        prover.push(eq(x().modulo(3), 2) & ge(x(), 4)).unwrap();
        assert_eq!(prover.check().unwrap(), SatResult::Sat);
    }

    #[test]
    fn interruption_is_monotonic() {
        let solver = FourierMotzkinSolver::new();
        let mut prover = solver.new_prover().unwrap();
        prover.push(gt(x(), 0)).unwrap();
        solver.interrupt();
        assert!(matches!(prover.check(), Err(LrError::Interrupted(_))));
        assert!(solver.is_interrupted());
        assert!(solver.new_prover().is_err());
    }
}
