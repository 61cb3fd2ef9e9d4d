//! Operator overloading and free-function builders for terms and formulas.
//!
//! ```
//! use lrformal::prelude::*;
//!
//! let x = Term::var("x");
//! let guard = gt(x.clone(), 0) & le(x.clone() - 1, 10);
//! assert_eq!(guard.to_string(), "x > 0 /\\ x - 1 <= 10");
//! ```
use std::ops::{Add, BitAnd, BitOr, Mul, Neg, Not, Sub};

use num_bigint::BigInt;

use crate::{
    expr::{CmpOp, Formula, Term},
    variable::Variable,
};

impl From<Variable> for Term {
    fn from(variable: Variable) -> Self {
        Term::Var(variable)
    }
}

impl From<&Variable> for Term {
    fn from(variable: &Variable) -> Self {
        Term::Var(variable.clone())
    }
}

impl From<BigInt> for Term {
    fn from(value: BigInt) -> Self {
        Term::Const(value)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Const(BigInt::from(value))
    }
}

impl From<i32> for Term {
    fn from(value: i32) -> Self {
        Term::Const(BigInt::from(value))
    }
}

impl<T: Into<Term>> Add<T> for Term {
    type Output = Term;

    fn add(self, rhs: T) -> Term {
        Term::Add(vec![self, rhs.into()])
    }
}

impl<T: Into<Term>> Sub<T> for Term {
    type Output = Term;

    fn sub(self, rhs: T) -> Term {
        Term::Add(vec![self, Term::Neg(Box::new(rhs.into()))])
    }
}

impl<T: Into<Term>> Mul<T> for Term {
    type Output = Term;

    fn mul(self, rhs: T) -> Term {
        Term::Mul(Box::new(self), Box::new(rhs.into()))
    }
}

impl Neg for Term {
    type Output = Term;

    fn neg(self) -> Term {
        Term::Neg(Box::new(self))
    }
}

impl BitAnd for Formula {
    type Output = Formula;

    fn bitand(self, rhs: Formula) -> Formula {
        let mut args = self.into_conjuncts();
        args.extend(rhs.into_conjuncts());
        Formula::And(args)
    }
}

impl BitOr for Formula {
    type Output = Formula;

    fn bitor(self, rhs: Formula) -> Formula {
        let mut args = self.into_disjuncts();
        args.extend(rhs.into_disjuncts());
        Formula::Or(args)
    }
}

impl Not for Formula {
    type Output = Formula;

    fn not(self) -> Formula {
        Formula::Not(Box::new(self))
    }
}

pub fn eq(lhs: impl Into<Term>, rhs: impl Into<Term>) -> Formula {
    Formula::compare(CmpOp::Eq, lhs, rhs)
}

pub fn ne(lhs: impl Into<Term>, rhs: impl Into<Term>) -> Formula {
    Formula::compare(CmpOp::Ne, lhs, rhs)
}

pub fn lt(lhs: impl Into<Term>, rhs: impl Into<Term>) -> Formula {
    Formula::compare(CmpOp::Lt, lhs, rhs)
}

pub fn le(lhs: impl Into<Term>, rhs: impl Into<Term>) -> Formula {
    Formula::compare(CmpOp::Le, lhs, rhs)
}

pub fn gt(lhs: impl Into<Term>, rhs: impl Into<Term>) -> Formula {
    Formula::compare(CmpOp::Gt, lhs, rhs)
}

pub fn ge(lhs: impl Into<Term>, rhs: impl Into<Term>) -> Formula {
    Formula::compare(CmpOp::Ge, lhs, rhs)
}
