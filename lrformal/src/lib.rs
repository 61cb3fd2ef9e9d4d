//! Lrformal: integer formulas and the linear-arithmetic machinery behind lasso analysis.
//!
//! This crate provides the formula language shared by every part of the termination
//! analysis, together with the passes that bring a path formula into a shape a ranking
//! synthesizer can consume.
//!
//! Layers
//!  - [`expr`]: terms and formulas over unbounded integers, evaluation, substitution and a
//!    colored pretty-printer.
//!  - [`walker`]: a stack-based bottom-up rewriter; every normalization pass is a
//!    [`walker::Rewriter`].
//!  - [`normalize`]: the pipeline turning a formula into a set of linear clauses.
//!  - [`linear`]: affine expressions, inequalities, polyhedra and integer-tightened
//!    Fourier-Motzkin elimination.
//!
//! Example
//! ```
//! use lrformal::prelude::*;
//!
//! // x > 0 /\ x' = x - 1, with x' written as the SSA instance x@2
//! let x1 = Term::Var(Variable::indexed("x", 1));
//! let x2 = Term::Var(Variable::indexed("x", 2));
//! let step = gt(x1.clone(), 0) & eq(x2, x1 - 1);
//!
//! let clauses = FormulaNormalizer::new().normalize(&step);
//! assert_eq!(clauses.len(), 1);
//!
//! let polyhedron = Polyhedron::from_clause(clauses.first().unwrap()).unwrap();
//! assert_eq!(polyhedron.constraints().len(), 3);
//! ```

/// Terms, formulas, operators and pretty-printing.
pub mod expr;
/// Linear expressions, inequalities, polyhedra and Fourier-Motzkin elimination.
pub mod linear;
/// Formula normalization passes.
pub mod normalize;
/// Variables with SSA indices and fresh-name generation.
pub mod variable;
/// Bottom-up rewriting and traversal.
pub mod walker;

pub mod prelude {
    //! Convenient re-exports for end users.
    //!
    //! - Formula and term types with the `eq`/`lt`/... builders
    //! - Pretty-printing via `PrettyFormula`
    //! - Variable types
    //! - The normalizer and linear-arithmetic types
    pub use crate::expr::{CmpOp, Formula, Model, Term, ops::*, pretty::PrettyFormula};
    pub use crate::linear::{
        Feasibility, FourierMotzkin, LinearError, LinearExpr, LinearInequality, Polyhedron,
    };
    pub use crate::normalize::FormulaNormalizer;
    pub use crate::variable::{FreshNames, Variable};
}
