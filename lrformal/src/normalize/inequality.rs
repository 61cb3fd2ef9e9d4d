use crate::{
    expr::{CmpOp, Formula, Term},
    walker::{Rewriter, rewrite_formula},
};

/// Remove negated comparisons and disequalities from a formula in negation normal form.
///
/// `!(a op b)` becomes `a op' b` with the complementary operator, and `a != b` becomes
/// `a < b \/ a > b`. Strict inequalities are kept.
pub fn eliminate_disequalities(formula: &Formula) -> Formula {
    let positive = rewrite_formula(formula.clone(), &mut NegatedAtoms);
    rewrite_formula(positive, &mut Disequalities)
}

/// Replace every equality `a = b` by `a <= b /\ a >= b`.
pub fn eliminate_equalities(formula: &Formula) -> Formula {
    rewrite_formula(formula.clone(), &mut Equalities)
}

struct NegatedAtoms;

impl Rewriter for NegatedAtoms {
    fn rewrite_not(&mut self, inner: Formula) -> Formula {
        match inner {
            Formula::Cmp(op, lhs, rhs) => Formula::Cmp(op.negate(), lhs, rhs),
            other => Formula::Not(Box::new(other)),
        }
    }
}

struct Disequalities;

impl Rewriter for Disequalities {
    fn rewrite_cmp(&mut self, op: CmpOp, lhs: Term, rhs: Term) -> Formula {
        match op {
            CmpOp::Ne => Formula::Or(vec![
                Formula::Cmp(CmpOp::Lt, lhs.clone(), rhs.clone()),
                Formula::Cmp(CmpOp::Gt, lhs, rhs),
            ]),
            op => Formula::Cmp(op, lhs, rhs),
        }
    }
}

struct Equalities;

impl Rewriter for Equalities {
    fn rewrite_cmp(&mut self, op: CmpOp, lhs: Term, rhs: Term) -> Formula {
        match op {
            CmpOp::Eq => Formula::And(vec![
                Formula::Cmp(CmpOp::Le, lhs.clone(), rhs.clone()),
                Formula::Cmp(CmpOp::Ge, lhs, rhs),
            ]),
            op => Formula::Cmp(op, lhs, rhs),
        }
    }
}
