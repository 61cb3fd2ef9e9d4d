//! Reduction of arbitrary path formulas to sets of linear clauses.
//!
//! [`FormulaNormalizer::normalize`] runs the passes below in a fixed order, each one a
//! [`Rewriter`](crate::walker::Rewriter) over the whole formula:
//!
//! 1. [`simplify`]: constant folding and flattening.
//! 2. [`eliminate_ite`]: if-then-else terms become fresh variables with a definition.
//! 3. [`eliminate_div_mod`]: division and remainder become fresh quotient/remainder
//!    variables with their Euclidean axioms.
//! 4. [`to_nnf`]: negations are pushed down to the comparisons.
//! 5. [`eliminate_disequalities`]: negated comparisons and `!=` disappear.
//! 6. [`eliminate_equalities`]: `a = b` becomes `a <= b /\ a >= b`.
//! 7. [`to_dnf`]: bounded distribution into a disjunction of clauses.
//!
//! The top-level disjuncts of the result are the clauses. Every clause is a conjunction of
//! `<`, `<=`, `>` and `>=` comparisons, unless the DNF bound was hit, in which case some
//! clause still carries a disjunction and later fails polyhedron extraction.
//!
//! ```
//! use lrformal::prelude::*;
//! use lrformal::normalize::FormulaNormalizer;
//!
//! let x = Term::var("x");
//! let f = ne(x.clone(), 0) & le(x, 10);
//! let clauses = FormulaNormalizer::new().normalize(&f);
//! assert_eq!(clauses.len(), 2);
//! ```

mod divmod;
mod dnf;
mod inequality;
mod ite;
mod nnf;
mod simplify;

use std::collections::BTreeSet;

use log::{debug, trace};

use crate::{expr::Formula, variable::FreshNames};

pub use divmod::eliminate_div_mod;
pub use dnf::{Dnf, to_dnf};
pub use inequality::{eliminate_disequalities, eliminate_equalities};
pub use ite::eliminate_ite;
pub use nnf::to_nnf;
pub use simplify::simplify;

/// Clause bound of the DNF conversion.
pub const DEFAULT_MAX_DNF_CLAUSES: usize = 1_000_000;

/// Runs the normalization pipeline and owns the fresh-name counter of its elimination
/// passes.
///
/// Formulas normalized by the same instance never share auxiliary variables unless they
/// share them on input.
#[derive(Debug, Clone)]
pub struct FormulaNormalizer {
    fresh: FreshNames,
    max_dnf_clauses: usize,
}

impl Default for FormulaNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaNormalizer {
    pub fn new() -> Self {
        Self {
            fresh: FreshNames::new(),
            max_dnf_clauses: DEFAULT_MAX_DNF_CLAUSES,
        }
    }

    pub fn with_max_dnf_clauses(mut self, max_dnf_clauses: usize) -> Self {
        self.max_dnf_clauses = max_dnf_clauses;
        self
    }

    pub fn max_dnf_clauses(&self) -> usize {
        self.max_dnf_clauses
    }

    pub fn fresh_names(&self) -> &FreshNames {
        &self.fresh
    }

    /// Clauses whose disjunction is equisatisfiable with `formula` (auxiliary variables
    /// read as existentially quantified).
    pub fn normalize(&mut self, formula: &Formula) -> BTreeSet<Formula> {
        let simplified = simplify(formula);
        let without_ite = eliminate_ite(&simplified, &mut self.fresh);
        let without_div = eliminate_div_mod(&without_ite, &mut self.fresh);
        let nnf = to_nnf(&without_div);
        let positive = eliminate_disequalities(&nnf);
        let inequalities = eliminate_equalities(&positive);
        trace!("normalizing {inequalities}");

        let dnf = to_dnf(&inequalities, self.max_dnf_clauses);
        let clauses: BTreeSet<Formula> = dnf.formula.into_disjuncts().into_iter().collect();
        debug!(
            "normalized formula into {} clause(s){}",
            clauses.len(),
            if dnf.gave_up { " (DNF bound hit)" } else { "" }
        );
        clauses
    }
}
