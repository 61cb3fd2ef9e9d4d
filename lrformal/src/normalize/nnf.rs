use crate::{
    expr::Formula,
    walker::{Rewriter, rewrite_formula},
};

/// Negation normal form: only conjunction, disjunction and negated comparisons remain.
///
/// Implications, equivalences and formula-level if-then-else are expanded on the way.
pub fn to_nnf(formula: &Formula) -> Formula {
    rewrite_formula(formula.clone(), &mut Nnf)
}

struct Nnf;

impl Rewriter for Nnf {
    fn rewrite_not(&mut self, inner: Formula) -> Formula {
        negate(inner)
    }

    fn rewrite_implies(&mut self, lhs: Formula, rhs: Formula) -> Formula {
        Formula::Or(vec![negate(lhs), rhs])
    }

    fn rewrite_iff(&mut self, lhs: Formula, rhs: Formula) -> Formula {
        let both = Formula::And(vec![lhs.clone(), rhs.clone()]);
        let neither = Formula::And(vec![negate(lhs), negate(rhs)]);
        Formula::Or(vec![both, neither])
    }

    fn rewrite_ite(&mut self, condition: Formula, then_branch: Formula, else_branch: Formula) -> Formula {
        let taken = Formula::And(vec![condition.clone(), then_branch]);
        let skipped = Formula::And(vec![negate(condition), else_branch]);
        Formula::Or(vec![taken, skipped])
    }
}

/// Negation of a formula already in negation normal form, again in negation normal form.
fn negate(formula: Formula) -> Formula {
    match formula {
        Formula::True => Formula::False,
        Formula::False => Formula::True,
        Formula::Not(inner) => *inner,
        Formula::And(args) => Formula::Or(args.into_iter().map(negate).collect()),
        Formula::Or(args) => Formula::And(args.into_iter().map(negate).collect()),
        // Children are rewritten before their parent, so connectives other than and/or
        // never reach this point.
        other => Formula::Not(Box::new(other)),
    }
}
