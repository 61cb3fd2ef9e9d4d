use std::collections::BTreeSet;

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::{
    expr::{CmpOp, Formula, Term, euclid_div_rem},
    walker::{Rewriter, rewrite_formula},
};

/// Constant folding and flattening.
///
/// Sums are flattened with their constants folded into one trailing summand, products and
/// quotients of constants are evaluated, double negations vanish, and conjunctions and
/// disjunctions are flattened, deduplicated and put into canonical order with their
/// neutral and absorbing elements resolved. Division by a constant zero is left alone.
pub fn simplify(formula: &Formula) -> Formula {
    rewrite_formula(formula.clone(), &mut Simplifier)
}

struct Simplifier;

impl Rewriter for Simplifier {
    fn rewrite_add(&mut self, args: Vec<Term>) -> Term {
        let mut constant = BigInt::zero();
        let mut summands = Vec::with_capacity(args.len());
        let mut pending = args;
        pending.reverse();
        while let Some(arg) = pending.pop() {
            match arg {
                Term::Const(value) => constant += value,
                Term::Add(nested) => pending.extend(nested.into_iter().rev()),
                other => summands.push(other),
            }
        }
        if !constant.is_zero() {
            summands.push(Term::Const(constant));
        }
        match summands.len() {
            0 => Term::zero(),
            1 => summands.swap_remove(0),
            _ => Term::Add(summands),
        }
    }

    fn rewrite_mul(&mut self, lhs: Term, rhs: Term) -> Term {
        match (lhs, rhs) {
            (Term::Const(a), Term::Const(b)) => Term::Const(a * b),
            (Term::Const(c), _) | (_, Term::Const(c)) if c.is_zero() => Term::zero(),
            (Term::Const(c), other) | (other, Term::Const(c)) if c.is_one() => other,
            (lhs, rhs) => Term::Mul(Box::new(lhs), Box::new(rhs)),
        }
    }

    fn rewrite_neg(&mut self, inner: Term) -> Term {
        match inner {
            Term::Const(value) => Term::Const(-value),
            Term::Neg(inner) => *inner,
            other => Term::Neg(Box::new(other)),
        }
    }

    fn rewrite_div(&mut self, lhs: Term, rhs: Term) -> Term {
        match (&lhs, &rhs) {
            (_, Term::Const(one)) if one.is_one() => lhs,
            (Term::Const(a), Term::Const(b)) => match euclid_div_rem(a, b) {
                Some((q, _)) => Term::Const(q),
                None => lhs.div(rhs),
            },
            _ => lhs.div(rhs),
        }
    }

    fn rewrite_mod(&mut self, lhs: Term, rhs: Term) -> Term {
        match (&lhs, &rhs) {
            (_, Term::Const(one)) if one.is_one() => Term::zero(),
            (Term::Const(a), Term::Const(b)) => match euclid_div_rem(a, b) {
                Some((_, r)) => Term::Const(r),
                None => lhs.modulo(rhs),
            },
            _ => lhs.modulo(rhs),
        }
    }

    fn rewrite_term_ite(&mut self, condition: Formula, then_branch: Term, else_branch: Term) -> Term {
        match condition {
            Formula::True => then_branch,
            Formula::False => else_branch,
            _ if then_branch == else_branch => then_branch,
            condition => Term::ite(condition, then_branch, else_branch),
        }
    }

    fn rewrite_cmp(&mut self, op: CmpOp, lhs: Term, rhs: Term) -> Formula {
        match (&lhs, &rhs) {
            (Term::Const(a), Term::Const(b)) => bool_formula(op.holds(a, b)),
            _ if lhs == rhs => bool_formula(matches!(op, CmpOp::Eq | CmpOp::Le | CmpOp::Ge)),
            _ => Formula::Cmp(op, lhs, rhs),
        }
    }

    fn rewrite_not(&mut self, inner: Formula) -> Formula {
        match inner {
            Formula::True => Formula::False,
            Formula::False => Formula::True,
            Formula::Not(inner) => *inner,
            other => Formula::Not(Box::new(other)),
        }
    }

    fn rewrite_and(&mut self, args: Vec<Formula>) -> Formula {
        let mut conjuncts = BTreeSet::new();
        let mut pending = args;
        while let Some(arg) = pending.pop() {
            match arg {
                Formula::True => {}
                Formula::False => return Formula::False,
                Formula::And(nested) => pending.extend(nested),
                other => {
                    conjuncts.insert(other);
                }
            }
        }
        Formula::and(conjuncts)
    }

    fn rewrite_or(&mut self, args: Vec<Formula>) -> Formula {
        let mut disjuncts = BTreeSet::new();
        let mut pending = args;
        while let Some(arg) = pending.pop() {
            match arg {
                Formula::False => {}
                Formula::True => return Formula::True,
                Formula::Or(nested) => pending.extend(nested),
                other => {
                    disjuncts.insert(other);
                }
            }
        }
        Formula::or(disjuncts)
    }

    fn rewrite_implies(&mut self, lhs: Formula, rhs: Formula) -> Formula {
        match (lhs, rhs) {
            (Formula::False, _) | (_, Formula::True) => Formula::True,
            (Formula::True, rhs) => rhs,
            (lhs, Formula::False) => self.rewrite_not(lhs),
            (lhs, rhs) => lhs.implies(rhs),
        }
    }

    fn rewrite_iff(&mut self, lhs: Formula, rhs: Formula) -> Formula {
        match (lhs, rhs) {
            (Formula::True, other) | (other, Formula::True) => other,
            (Formula::False, other) | (other, Formula::False) => self.rewrite_not(other),
            (lhs, rhs) if lhs == rhs => Formula::True,
            (lhs, rhs) => lhs.iff(rhs),
        }
    }

    fn rewrite_ite(&mut self, condition: Formula, then_branch: Formula, else_branch: Formula) -> Formula {
        match condition {
            Formula::True => then_branch,
            Formula::False => else_branch,
            _ if then_branch == else_branch => then_branch,
            condition => Formula::ite(condition, then_branch, else_branch),
        }
    }
}

fn bool_formula(value: bool) -> Formula {
    if value { Formula::True } else { Formula::False }
}
