use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use strum::EnumIs;

use crate::{expr::Formula, variable::Variable};

/// Integer assignment used to evaluate terms and formulas.
pub type Model = BTreeMap<Variable, BigInt>;

/// Integer-valued term.
///
/// `Div` and `Mod` follow the SMT-LIB integer convention: the remainder always lies in
/// `[0, |b|)` whatever the signs of the operands.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
pub enum Term {
    Var(Variable),
    Const(BigInt),
    Add(Vec<Term>),
    Mul(Box<Term>, Box<Term>),
    Neg(Box<Term>),
    Div(Box<Term>, Box<Term>),
    Mod(Box<Term>, Box<Term>),
    Ite(Box<Formula>, Box<Term>, Box<Term>),
}

impl Term {
    /// Uninstantiated variable `name`.
    pub fn var(name: &str) -> Self {
        Term::Var(Variable::new(name))
    }

    pub fn int(value: i64) -> Self {
        Term::Const(BigInt::from(value))
    }

    pub fn zero() -> Self {
        Term::Const(BigInt::zero())
    }

    pub fn as_const(&self) -> Option<&BigInt> {
        match self {
            Term::Const(value) => Some(value),
            _ => None,
        }
    }

    pub fn ite(condition: Formula, then_branch: impl Into<Term>, else_branch: impl Into<Term>) -> Self {
        Term::Ite(
            Box::new(condition),
            Box::new(then_branch.into()),
            Box::new(else_branch.into()),
        )
    }

    /// Integer division.
    pub fn div(self, rhs: impl Into<Term>) -> Self {
        Term::Div(Box::new(self), Box::new(rhs.into()))
    }

    /// Integer remainder.
    pub fn modulo(self, rhs: impl Into<Term>) -> Self {
        Term::Mod(Box::new(self), Box::new(rhs.into()))
    }

    /// Evaluate under `model`. `None` when a variable is unassigned or a divisor is zero.
    pub fn eval(&self, model: &Model) -> Option<BigInt> {
        match self {
            Term::Var(variable) => model.get(variable).cloned(),
            Term::Const(value) => Some(value.clone()),
            Term::Add(args) => args
                .iter()
                .try_fold(BigInt::zero(), |acc, arg| Some(acc + arg.eval(model)?)),
            Term::Mul(lhs, rhs) => Some(lhs.eval(model)? * rhs.eval(model)?),
            Term::Neg(inner) => Some(-inner.eval(model)?),
            Term::Div(lhs, rhs) => euclid_div_rem(&lhs.eval(model)?, &rhs.eval(model)?).map(|(q, _)| q),
            Term::Mod(lhs, rhs) => euclid_div_rem(&lhs.eval(model)?, &rhs.eval(model)?).map(|(_, r)| r),
            Term::Ite(condition, then_branch, else_branch) => {
                if condition.eval(model)? {
                    then_branch.eval(model)
                } else {
                    else_branch.eval(model)
                }
            }
        }
    }
}

/// Euclidean quotient and remainder, `a = q*b + r` with `0 <= r < |b|`.
pub fn euclid_div_rem(a: &BigInt, b: &BigInt) -> Option<(BigInt, BigInt)> {
    if b.is_zero() {
        return None;
    }
    let mut r = a % b;
    if r.is_negative() {
        r += b.abs();
    }
    let q = (a - &r) / b;
    Some((q, r))
}
