//! Linear integer arithmetic: affine expressions, inequalities and polyhedra.
//!
//! A normalized clause (see [`crate::normalize`]) is a conjunction of comparisons between
//! linear terms. [`Polyhedron::from_clause`] turns such a clause into a list of
//! [`LinearInequality`] values of the shape `expr >= 0` or `expr > 0`; anything else
//! (products of variables, leftover division, disjunctions left behind by the DNF
//! fallback) is rejected with a [`LinearError`].

mod fourier_motzkin;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    ops::{Add, Neg, Sub},
};

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use thiserror::Error;

use crate::{
    expr::{CmpOp, Formula, Model, Term, euclid_div_rem},
    variable::Variable,
};

pub use fourier_motzkin::{Feasibility, FourierMotzkin};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinearError {
    #[error("non-linear term '{0}'")]
    NonLinear(String),

    #[error("unsupported atom '{0}' in a linear clause")]
    UnsupportedAtom(String),
}

/// `sum(coefficient * variable) + constant` with integer coefficients; zero coefficients
/// are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinearExpr {
    coefficients: BTreeMap<Variable, BigInt>,
    constant: BigInt,
}

impl LinearExpr {
    pub fn constant(value: impl Into<BigInt>) -> Self {
        Self {
            coefficients: BTreeMap::new(),
            constant: value.into(),
        }
    }

    pub fn variable(variable: Variable) -> Self {
        Self::monomial(BigInt::one(), variable)
    }

    pub fn monomial(coefficient: BigInt, variable: Variable) -> Self {
        let mut coefficients = BTreeMap::new();
        if !coefficient.is_zero() {
            coefficients.insert(variable, coefficient);
        }
        Self {
            coefficients,
            constant: BigInt::zero(),
        }
    }

    /// Linearize `term`; fails on products of non-constant factors, division or remainder
    /// by a non-constant, and if-then-else.
    pub fn from_term(term: &Term) -> Result<Self, LinearError> {
        match term {
            Term::Var(variable) => Ok(Self::variable(variable.clone())),
            Term::Const(value) => Ok(Self::constant(value.clone())),
            Term::Add(args) => {
                let mut sum = Self::default();
                for arg in args {
                    sum.add_scaled(&Self::from_term(arg)?, &BigInt::one());
                }
                Ok(sum)
            }
            Term::Neg(inner) => Ok(-Self::from_term(inner)?),
            Term::Mul(lhs, rhs) => {
                let lhs = Self::from_term(lhs)?;
                let rhs = Self::from_term(rhs)?;
                if lhs.is_constant() {
                    Ok(rhs.scale(&lhs.constant))
                } else if rhs.is_constant() {
                    Ok(lhs.scale(&rhs.constant))
                } else {
                    Err(LinearError::NonLinear(term.to_string()))
                }
            }
            Term::Div(lhs, rhs) | Term::Mod(lhs, rhs) => {
                let lhs = Self::from_term(lhs)?;
                let rhs = Self::from_term(rhs)?;
                let quotient = match (lhs.is_constant(), rhs.is_constant()) {
                    (true, true) => euclid_div_rem(&lhs.constant, &rhs.constant),
                    _ => None,
                };
                match (quotient, term) {
                    (Some((q, _)), Term::Div(..)) => Ok(Self::constant(q)),
                    (Some((_, r)), _) => Ok(Self::constant(r)),
                    (None, _) => Err(LinearError::NonLinear(term.to_string())),
                }
            }
            Term::Ite(..) => Err(LinearError::NonLinear(term.to_string())),
        }
    }

    pub fn coefficients(&self) -> &BTreeMap<Variable, BigInt> {
        &self.coefficients
    }

    pub fn coefficient(&self, variable: &Variable) -> Option<&BigInt> {
        self.coefficients.get(variable)
    }

    pub fn constant_part(&self) -> &BigInt {
        &self.constant
    }

    pub fn is_constant(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.coefficients.keys()
    }

    pub fn scale(&self, factor: &BigInt) -> Self {
        if factor.is_zero() {
            return Self::default();
        }
        Self {
            coefficients: self
                .coefficients
                .iter()
                .map(|(variable, coefficient)| (variable.clone(), coefficient * factor))
                .collect(),
            constant: &self.constant * factor,
        }
    }

    /// `self += factor * other`.
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: &BigInt) {
        for (variable, coefficient) in &other.coefficients {
            let entry = self
                .coefficients
                .entry(variable.clone())
                .or_insert_with(BigInt::zero);
            *entry += coefficient * factor;
            if entry.is_zero() {
                self.coefficients.remove(variable);
            }
        }
        self.constant += &other.constant * factor;
    }

    pub fn eval(&self, model: &Model) -> Option<BigInt> {
        let mut value = self.constant.clone();
        for (variable, coefficient) in &self.coefficients {
            value += coefficient * model.get(variable)?;
        }
        Some(value)
    }

    /// Value of everything but `skip`, unassigned variables counting as zero.
    pub(crate) fn eval_without(&self, skip: &Variable, model: &Model) -> BigInt {
        let mut value = self.constant.clone();
        for (variable, coefficient) in &self.coefficients {
            if variable != skip {
                if let Some(assigned) = model.get(variable) {
                    value += coefficient * assigned;
                }
            }
        }
        value
    }

    /// Rename variables; coefficients of variables mapped onto the same target add up.
    pub fn rename(&self, mapping: &BTreeMap<Variable, Variable>) -> Self {
        let mut renamed = Self::constant(self.constant.clone());
        for (variable, coefficient) in &self.coefficients {
            let target = mapping.get(variable).unwrap_or(variable).clone();
            renamed.add_scaled(&Self::monomial(coefficient.clone(), target), &BigInt::one());
        }
        renamed
    }

    pub fn to_term(&self) -> Term {
        let mut summands: Vec<Term> = self
            .coefficients
            .iter()
            .map(|(variable, coefficient)| monomial_term(coefficient, variable))
            .collect();
        if !self.constant.is_zero() || summands.is_empty() {
            summands.push(Term::Const(self.constant.clone()));
        }
        if summands.len() == 1 {
            summands.swap_remove(0)
        } else {
            Term::Add(summands)
        }
    }
}

fn monomial_term(coefficient: &BigInt, variable: &Variable) -> Term {
    let var = Term::Var(variable.clone());
    if coefficient.is_one() {
        var
    } else if (-coefficient).is_one() {
        Term::Neg(Box::new(var))
    } else {
        Term::Mul(Box::new(Term::Const(coefficient.clone())), Box::new(var))
    }
}

impl Add<&LinearExpr> for &LinearExpr {
    type Output = LinearExpr;

    fn add(self, rhs: &LinearExpr) -> LinearExpr {
        let mut sum = self.clone();
        sum.add_scaled(rhs, &BigInt::one());
        sum
    }
}

impl Sub<&LinearExpr> for &LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: &LinearExpr) -> LinearExpr {
        let mut difference = self.clone();
        difference.add_scaled(rhs, &-BigInt::one());
        difference
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self.scale(&-BigInt::one())
    }
}

impl fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_term().fmt(f)
    }
}

/// `expr >= 0`, or `expr > 0` when strict.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinearInequality {
    expr: LinearExpr,
    strict: bool,
}

impl LinearInequality {
    pub fn new(expr: LinearExpr, strict: bool) -> Self {
        Self { expr, strict }
    }

    pub fn non_strict(expr: LinearExpr) -> Self {
        Self::new(expr, false)
    }

    /// `-1 >= 0`.
    pub fn contradiction() -> Self {
        Self::non_strict(LinearExpr::constant(-1))
    }

    pub fn from_comparison(op: CmpOp, lhs: &Term, rhs: &Term) -> Result<Self, LinearError> {
        let left = LinearExpr::from_term(lhs)?;
        let right = LinearExpr::from_term(rhs)?;
        match op {
            CmpOp::Ge => Ok(Self::new(&left - &right, false)),
            CmpOp::Gt => Ok(Self::new(&left - &right, true)),
            CmpOp::Le => Ok(Self::new(&right - &left, false)),
            CmpOp::Lt => Ok(Self::new(&right - &left, true)),
            CmpOp::Eq | CmpOp::Ne => Err(LinearError::UnsupportedAtom(
                Formula::Cmp(op, lhs.clone(), rhs.clone()).to_string(),
            )),
        }
    }

    pub fn expr(&self) -> &LinearExpr {
        &self.expr
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Integer normal form: strict inequalities become `expr - 1 >= 0`, coefficients are
    /// divided by their gcd and the constant rounded down.
    pub fn tightened(&self) -> Self {
        let mut expr = self.expr.clone();
        if self.strict {
            expr.constant -= BigInt::one();
        }
        let divisor = expr
            .coefficients
            .values()
            .fold(BigInt::zero(), |acc, coefficient| gcd(&acc, coefficient));
        if divisor > BigInt::one() {
            for coefficient in expr.coefficients.values_mut() {
                *coefficient /= &divisor;
            }
            expr.constant = floor_div(&expr.constant, &divisor);
        }
        Self::non_strict(expr)
    }

    /// Truth value of a variable-free inequality.
    pub fn constant_truth(&self) -> Option<bool> {
        if !self.expr.is_constant() {
            return None;
        }
        let value = &self.expr.constant;
        Some(if self.strict { value.is_positive() } else { !value.is_negative() })
    }

    /// `!(e >= 0)` is `-e > 0` and `!(e > 0)` is `-e >= 0`.
    pub fn negated(&self) -> Self {
        Self::new(-self.expr.clone(), !self.strict)
    }

    pub fn holds(&self, model: &Model) -> Option<bool> {
        let value = self.expr.eval(model)?;
        Some(if self.strict { value.is_positive() } else { !value.is_negative() })
    }

    pub fn rename(&self, mapping: &BTreeMap<Variable, Variable>) -> Self {
        Self::new(self.expr.rename(mapping), self.strict)
    }

    /// Comparison with positive summands on the left and negated negative ones on the right.
    pub fn to_formula(&self) -> Formula {
        let mut positive = LinearExpr::default();
        let mut negative = LinearExpr::default();
        for (variable, coefficient) in &self.expr.coefficients {
            if coefficient.is_positive() {
                positive.coefficients.insert(variable.clone(), coefficient.clone());
            } else {
                negative.coefficients.insert(variable.clone(), -coefficient);
            }
        }
        if self.expr.constant.is_positive() {
            positive.constant = self.expr.constant.clone();
        } else {
            negative.constant = -&self.expr.constant;
        }
        let op = if self.strict { CmpOp::Gt } else { CmpOp::Ge };
        Formula::Cmp(op, positive.to_term(), negative.to_term())
    }
}

impl fmt::Display for LinearInequality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_formula().fmt(f)
    }
}

/// Conjunction of linear inequalities.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Polyhedron {
    constraints: Vec<LinearInequality>,
}

impl Polyhedron {
    /// The polyhedron without constraints.
    pub fn universe() -> Self {
        Self::default()
    }

    pub fn new(constraints: Vec<LinearInequality>) -> Self {
        Self { constraints }
    }

    /// Extract the inequalities of a normalized clause.
    pub fn from_clause(clause: &Formula) -> Result<Self, LinearError> {
        let mut constraints = Vec::new();
        let mut pending: Vec<&Formula> = clause.conjuncts().collect();
        while let Some(literal) = pending.pop() {
            match literal {
                Formula::And(nested) => pending.extend(nested),
                Formula::True => {}
                Formula::False => constraints.push(LinearInequality::contradiction()),
                Formula::Cmp(op, lhs, rhs) => {
                    constraints.push(LinearInequality::from_comparison(*op, lhs, rhs)?)
                }
                other => return Err(LinearError::UnsupportedAtom(other.to_string())),
            }
        }
        constraints.reverse();
        Ok(Self { constraints })
    }

    pub fn constraints(&self) -> &[LinearInequality] {
        &self.constraints
    }

    pub fn is_universe(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        self.constraints
            .iter()
            .flat_map(|constraint| constraint.expr.variables().cloned())
            .collect()
    }

    pub fn contains(&self, model: &Model) -> Option<bool> {
        let mut result = true;
        for constraint in &self.constraints {
            result &= constraint.holds(model)?;
        }
        Some(result)
    }

    pub fn rename(&self, mapping: &BTreeMap<Variable, Variable>) -> Self {
        Self::new(
            self.constraints
                .iter()
                .map(|constraint| constraint.rename(mapping))
                .collect(),
        )
    }

    pub fn to_formula(&self) -> Formula {
        Formula::and(self.constraints.iter().map(LinearInequality::to_formula))
    }
}

impl fmt::Display for Polyhedron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_formula().fmt(f)
    }
}

pub(crate) fn gcd(a: &BigInt, b: &BigInt) -> BigInt {
    let mut a = a.abs();
    let mut b = b.abs();
    while !b.is_zero() {
        let r = &a % &b;
        a = b;
        b = r;
    }
    a
}

/// `floor(a / b)` for positive `b`.
pub(crate) fn floor_div(a: &BigInt, b: &BigInt) -> BigInt {
    let q = a / b;
    if (a % b).is_negative() { q - 1 } else { q }
}

/// `ceil(a / b)` for positive `b`.
pub(crate) fn ceil_div(a: &BigInt, b: &BigInt) -> BigInt {
    -floor_div(&-a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ops::*;

    fn x() -> Term {
        Term::Var(Variable::indexed("x", 1))
    }

    fn y() -> Term {
        Term::Var(Variable::indexed("y", 1))
    }

    #[test]
    fn linearizes_sums_and_constant_products() {
        let term = (x() + 3) * 2 - y() * Term::int(5).modulo(3);
        let expr = LinearExpr::from_term(&term).unwrap();
        assert_eq!(expr.coefficient(&Variable::indexed("x", 1)), Some(&BigInt::from(2)));
        assert_eq!(expr.coefficient(&Variable::indexed("y", 1)), Some(&BigInt::from(-2)));
        assert_eq!(expr.constant_part(), &BigInt::from(6));
    }

    #[test]
    fn rejects_products_of_variables() {
        assert!(matches!(
            LinearExpr::from_term(&(x() * y())),
            Err(LinearError::NonLinear(_))
        ));
        assert!(matches!(
            LinearExpr::from_term(&x().div(y())),
            Err(LinearError::NonLinear(_))
        ));
    }

    #[test]
    fn cancelling_coefficients_vanish() {
        let expr = LinearExpr::from_term(&(x() - x() + 1)).unwrap();
        assert!(expr.is_constant());
    }

    #[test]
    fn tightening_uses_integer_semantics() {
        // 2x > 3  ~>  2x - 4 >= 0  ~>  x - 2 >= 0
        let ineq = LinearInequality::from_comparison(CmpOp::Gt, &(x() * 2), &Term::int(3)).unwrap();
        let tight = ineq.tightened();
        assert!(!tight.is_strict());
        assert_eq!(tight.expr().coefficient(&Variable::indexed("x", 1)), Some(&BigInt::one()));
        assert_eq!(tight.expr().constant_part(), &BigInt::from(-2));
    }

    #[test]
    fn polyhedron_rejects_equalities_and_disjunctions() {
        assert!(Polyhedron::from_clause(&eq(x(), 1)).is_err());
        assert!(Polyhedron::from_clause(&(le(x(), 1) & (ge(y(), 0) | le(y(), 3)))).is_err());
        let poly = Polyhedron::from_clause(&(le(x(), 1) & gt(y(), x()))).unwrap();
        assert_eq!(poly.constraints().len(), 2);
        assert_eq!(poly.to_string(), "1 >= x@1 /\\ y@1 > x@1");
    }

    #[test]
    fn nested_conjunctions_are_flattened() {
        let nested = Formula::And(vec![
            Formula::And(vec![gt(x(), 0), le(y(), x() - 1)]),
            ge(y(), 2),
        ]);
        let poly = Polyhedron::from_clause(&nested).unwrap();
        assert_eq!(poly.constraints().len(), 3);
        let model = Model::from([
            (Variable::indexed("x", 1), BigInt::from(4)),
            (Variable::indexed("y", 1), BigInt::from(2)),
        ]);
        assert_eq!(poly.contains(&model), Some(true));
    }

    #[test]
    fn floor_and_ceil_division() {
        let b = BigInt::from(3);
        assert_eq!(floor_div(&BigInt::from(-7), &b), BigInt::from(-3));
        assert_eq!(ceil_div(&BigInt::from(-7), &b), BigInt::from(-2));
        assert_eq!(ceil_div(&BigInt::from(7), &b), BigInt::from(3));
    }
}
