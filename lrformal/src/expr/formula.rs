use std::collections::{BTreeMap, BTreeSet};

use either::Either;
use num_bigint::BigInt;
use strum::{EnumIs, EnumIter, IntoEnumIterator};

use crate::{
    expr::{Model, Term},
    variable::Variable,
    walker::{Rewriter, collect_variables, rewrite_formula},
};

/// Comparison operator of an atom `lhs op rhs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn to_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        CmpOp::iter().find(|op| op.to_str() == s)
    }

    /// Operator of the negated atom.
    pub fn negate(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }

    /// Operator obtained by swapping both operands.
    pub fn flip(self) -> Self {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
            other => other,
        }
    }

    pub fn is_strict(self) -> bool {
        matches!(self, CmpOp::Lt | CmpOp::Gt)
    }

    pub fn holds(self, lhs: &BigInt, rhs: &BigInt) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

/// Quantifier-free formula over integer terms.
///
/// Formulas are plain values: every transformation produces a new formula and leaves
/// its input untouched. `Ord` gives formulas a canonical order so they can be kept in
/// sets (clauses, ranking conditions).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
pub enum Formula {
    True,
    False,
    Cmp(CmpOp, Term, Term),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    Ite(Box<Formula>, Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn compare(op: CmpOp, lhs: impl Into<Term>, rhs: impl Into<Term>) -> Self {
        Formula::Cmp(op, lhs.into(), rhs.into())
    }

    /// Conjunction, collapsing the empty and singleton cases.
    pub fn and(args: impl IntoIterator<Item = Formula>) -> Self {
        let mut args: Vec<Formula> = args.into_iter().collect();
        match args.len() {
            0 => Formula::True,
            1 => args.swap_remove(0),
            _ => Formula::And(args),
        }
    }

    /// Disjunction, collapsing the empty and singleton cases.
    pub fn or(args: impl IntoIterator<Item = Formula>) -> Self {
        let mut args: Vec<Formula> = args.into_iter().collect();
        match args.len() {
            0 => Formula::False,
            1 => args.swap_remove(0),
            _ => Formula::Or(args),
        }
    }

    pub fn implies(self, rhs: Formula) -> Self {
        Formula::Implies(Box::new(self), Box::new(rhs))
    }

    pub fn iff(self, rhs: Formula) -> Self {
        Formula::Iff(Box::new(self), Box::new(rhs))
    }

    pub fn ite(condition: Formula, then_branch: Formula, else_branch: Formula) -> Self {
        Formula::Ite(
            Box::new(condition),
            Box::new(then_branch),
            Box::new(else_branch),
        )
    }

    /// Whether this is a comparison or a negated comparison.
    pub fn is_literal(&self) -> bool {
        match self {
            Formula::Cmp(..) => true,
            Formula::Not(inner) => inner.is_cmp(),
            _ => false,
        }
    }

    /// Top-level conjuncts (the formula itself when it is not a conjunction).
    pub fn conjuncts(&self) -> impl Iterator<Item = &Formula> {
        match self {
            Formula::And(args) => Either::Left(args.iter()),
            other => Either::Right(std::iter::once(other)),
        }
    }

    /// Top-level disjuncts (the formula itself when it is not a disjunction).
    pub fn disjuncts(&self) -> impl Iterator<Item = &Formula> {
        match self {
            Formula::Or(args) => Either::Left(args.iter()),
            other => Either::Right(std::iter::once(other)),
        }
    }

    /// Owned variant of [`Formula::conjuncts`].
    pub fn into_conjuncts(self) -> Vec<Formula> {
        match self {
            Formula::And(args) => args,
            other => vec![other],
        }
    }

    /// Owned variant of [`Formula::disjuncts`].
    pub fn into_disjuncts(self) -> Vec<Formula> {
        match self {
            Formula::Or(args) => args,
            other => vec![other],
        }
    }

    /// Evaluate under `model`. `None` when some term is undefined.
    pub fn eval(&self, model: &Model) -> Option<bool> {
        match self {
            Formula::True => Some(true),
            Formula::False => Some(false),
            Formula::Cmp(op, lhs, rhs) => Some(op.holds(&lhs.eval(model)?, &rhs.eval(model)?)),
            Formula::Not(inner) => inner.eval(model).map(|value| !value),
            Formula::And(args) => {
                let mut result = true;
                for arg in args {
                    result &= arg.eval(model)?;
                }
                Some(result)
            }
            Formula::Or(args) => {
                let mut result = false;
                for arg in args {
                    result |= arg.eval(model)?;
                }
                Some(result)
            }
            Formula::Implies(lhs, rhs) => Some(!lhs.eval(model)? || rhs.eval(model)?),
            Formula::Iff(lhs, rhs) => Some(lhs.eval(model)? == rhs.eval(model)?),
            Formula::Ite(condition, then_branch, else_branch) => {
                if condition.eval(model)? {
                    then_branch.eval(model)
                } else {
                    else_branch.eval(model)
                }
            }
        }
    }

    /// Free variables.
    pub fn variables(&self) -> BTreeSet<Variable> {
        collect_variables(self)
    }

    /// Replace every occurrence of a mapped variable by its term.
    pub fn substitute(&self, mapping: &BTreeMap<Variable, Term>) -> Formula {
        if mapping.is_empty() {
            return self.clone();
        }
        rewrite_formula(self.clone(), &mut Substitution { mapping })
    }
}

struct Substitution<'a> {
    mapping: &'a BTreeMap<Variable, Term>,
}

impl Rewriter for Substitution<'_> {
    fn rewrite_var(&mut self, variable: Variable) -> Term {
        match self.mapping.get(&variable) {
            Some(term) => term.clone(),
            None => Term::Var(variable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ops::*;

    #[test]
    fn cmp_operators_roundtrip_through_strings() {
        for op in CmpOp::iter() {
            assert_eq!(CmpOp::from_str(op.to_str()), Some(op));
            assert_eq!(op.negate().negate(), op);
            assert_eq!(op.flip().flip(), op);
        }
    }

    #[test]
    fn substitution_replaces_free_occurrences() {
        let x = Variable::new("x");
        let f = gt(Term::var("x") + 1, Term::var("y"));
        let mapping = BTreeMap::from([(x.clone(), Term::int(4))]);
        let g = f.substitute(&mapping);
        assert!(!g.variables().contains(&x));

        let model = Model::from([(Variable::new("y"), BigInt::from(4))]);
        assert_eq!(g.eval(&model), Some(true));
    }

    #[test]
    fn disjuncts_of_a_non_disjunction_is_itself() {
        let f = le(Term::var("x"), 0);
        assert_eq!(f.disjuncts().count(), 1);
        let g = f.clone() | ge(Term::var("x"), 3);
        assert_eq!(g.disjuncts().collect::<Vec<_>>(), vec![&f, &ge(Term::var("x"), 3)]);
    }

    #[test]
    fn chained_connectives_stay_flat() {
        let (a, b, c) = (gt(Term::var("x"), 0), le(Term::var("y"), 1), ge(Term::var("z"), 2));
        let all = a.clone() & b.clone() & c.clone();
        assert_eq!(all, Formula::And(vec![a.clone(), b.clone(), c.clone()]));
        assert_eq!(all.conjuncts().count(), 3);

        let any = a.clone() | (b.clone() | c.clone());
        assert_eq!(any, Formula::Or(vec![a, b, c]));
    }
}
