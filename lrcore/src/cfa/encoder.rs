use std::fmt;

use log::trace;
use lrformal::{
    prelude::{Formula, Term, Variable},
    variable::{AUX_PREFIX, NONDET_PREFIX},
    walker::{Rewriter, rewrite_formula, rewrite_term},
};

use crate::{
    cfa::{PathFormula, PathFormulaManager, SsaMapBuilder},
    utils::error::{LrError, LrResult},
};

/// Program edge over uninstantiated variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edge {
    Assume(Formula),
    Assign(String, Term),
    /// Assign an unknown value.
    Havoc(String),
    Skip,
}

impl Edge {
    pub fn assume(condition: Formula) -> Self {
        Edge::Assume(condition)
    }

    pub fn assign(target: &str, value: impl Into<Term>) -> Self {
        Edge::Assign(target.to_string(), value.into())
    }

    pub fn havoc(target: &str) -> Self {
        Edge::Havoc(target.to_string())
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Assume(condition) => write!(f, "assume({condition})"),
            Edge::Assign(target, value) => write!(f, "{target} := {value}"),
            Edge::Havoc(target) => write!(f, "havoc {target}"),
            Edge::Skip => f.write_str("skip"),
        }
    }
}

/// SSA encoding of [`Edge`]s.
///
/// Reads use the current index of a variable ([`super::DEFAULT_INDEX`] when untouched),
/// writes use a fresh one. A havoc equates its target with a fresh instance of the
/// nondeterministic placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsaEncoder;

impl SsaEncoder {
    pub fn new() -> Self {
        Self
    }

    fn check_target(target: &str) -> LrResult<()> {
        if target.starts_with(AUX_PREFIX) {
            return Err(LrError::PathFormula(format!(
                "cannot assign to reserved variable `{target}`"
            )));
        }
        Ok(())
    }
}

struct Instantiate<'a> {
    ssa: &'a mut SsaMapBuilder,
    malformed: Option<Variable>,
}

impl<'a> Instantiate<'a> {
    fn new(ssa: &'a mut SsaMapBuilder) -> Self {
        Self {
            ssa,
            malformed: None,
        }
    }

    fn finish<T>(self, value: T) -> LrResult<T> {
        match self.malformed {
            Some(variable) => Err(LrError::PathFormula(format!(
                "edge mentions the instantiated variable `{variable}`"
            ))),
            None => Ok(value),
        }
    }
}

impl Rewriter for Instantiate<'_> {
    fn rewrite_var(&mut self, variable: Variable) -> Term {
        if variable.index().is_some() {
            self.malformed.get_or_insert_with(|| variable.clone());
            return Term::Var(variable);
        }
        let index = self.ssa.touch(variable.name());
        Term::Var(variable.with_index(index))
    }
}

impl PathFormulaManager for SsaEncoder {
    type Edge = Edge;

    fn make_and(&self, formula: &PathFormula, edge: &Edge) -> LrResult<PathFormula> {
        let mut ssa = formula.ssa.builder();
        let conjunct = match edge {
            Edge::Assume(condition) => {
                let mut instantiate = Instantiate::new(&mut ssa);
                let condition = rewrite_formula(condition.clone(), &mut instantiate);
                instantiate.finish(condition)?
            }
            Edge::Assign(target, value) => {
                Self::check_target(target)?;
                let mut instantiate = Instantiate::new(&mut ssa);
                let value = rewrite_term(value.clone(), &mut instantiate);
                let value = instantiate.finish(value)?;
                let index = ssa.bump(target);
                Formula::compare(
                    lrformal::prelude::CmpOp::Eq,
                    Variable::indexed(target.as_str(), index),
                    value,
                )
            }
            Edge::Havoc(target) => {
                Self::check_target(target)?;
                let placeholder = ssa.bump(NONDET_PREFIX);
                let index = ssa.bump(target);
                Formula::compare(
                    lrformal::prelude::CmpOp::Eq,
                    Variable::indexed(target.as_str(), index),
                    Variable::indexed(NONDET_PREFIX, placeholder),
                )
            }
            Edge::Skip => Formula::True,
        };
        trace!("encoded `{edge}` as {conjunct}");

        let combined = match (&formula.formula, conjunct) {
            (Formula::True, conjunct) => conjunct,
            (previous, Formula::True) => previous.clone(),
            (previous, conjunct) => {
                Formula::and(previous.conjuncts().cloned().chain(std::iter::once(conjunct)))
            }
        };
        Ok(PathFormula {
            formula: combined,
            ssa: ssa.build(),
            length: formula.length + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrformal::prelude::*;

    fn x() -> Term {
        Term::var("x")
    }

    #[test]
    fn reads_and_writes_follow_ssa_indices() {
        let encoder = SsaEncoder::new();
        let edges = [
            Edge::assume(gt(x(), 0)),
            Edge::assign("x", x() - 1),
            Edge::Skip,
            Edge::assign("y", x() * 2),
        ];
        let path = encoder.formula_for_edges(&edges).unwrap();
        assert_eq!(path.formula.to_string(), "x@1 > 0 /\\ x@2 = x@1 - 1 /\\ y@2 = x@2 * 2");
        assert_eq!(path.ssa.get("x"), Some(2));
        assert_eq!(path.ssa.get("y"), Some(2));
        assert_eq!(path.length, 4);
    }

    #[test]
    fn havoc_uses_fresh_placeholders() {
        let encoder = SsaEncoder::new();
        let path = encoder
            .formula_for_edges(&[Edge::havoc("x"), Edge::havoc("x")])
            .unwrap();
        assert_eq!(path.formula.to_string(), "x@2 = __nondet@2 /\\ x@3 = __nondet@3");
    }

    #[test]
    fn context_continues_indices() {
        let encoder = SsaEncoder::new();
        let stem = encoder.formula_for_edges(&[Edge::assign("x", 5)]).unwrap();
        let start = encoder.empty_formula_with_context(&stem);
        assert_eq!(start.formula, Formula::True);
        let step = encoder.make_and(&start, &Edge::assign("x", x() + 1)).unwrap();
        assert_eq!(step.formula.to_string(), "x@3 = x@2 + 1");
        assert_eq!(step.length, 1);
    }

    #[test]
    fn malformed_edges_are_rejected() {
        let encoder = SsaEncoder::new();
        let indexed = Term::Var(Variable::indexed("x", 4));
        assert!(matches!(
            encoder.formula_for_edges(&[Edge::assume(gt(indexed, 0))]),
            Err(LrError::PathFormula(_))
        ));
        assert!(matches!(
            encoder.formula_for_edges(&[Edge::assign("__q0", 1)]),
            Err(LrError::PathFormula(_))
        ));
    }
}
