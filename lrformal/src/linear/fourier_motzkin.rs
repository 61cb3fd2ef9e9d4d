//! Fourier-Motzkin elimination over the integers.
//!
//! Every derived constraint is tightened to integer normal form, so a contradiction
//! derived here is a contradiction over the integers. The converse does not hold: the
//! rational shadow of an integer-infeasible system may be non-empty. Satisfiability is
//! therefore only reported together with an integer model that was checked against the
//! input; when back-substitution cannot produce one the answer is [`Feasibility::Unknown`].

use std::collections::BTreeSet;

use log::trace;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use smallvec::SmallVec;

use crate::{
    expr::Model,
    linear::{LinearInequality, ceil_div, floor_div},
    variable::Variable,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feasibility {
    Infeasible,
    /// Integer model satisfying every input constraint.
    Feasible(Model),
    /// Combination budget exhausted, or no integer model found.
    Unknown,
    Interrupted,
}

/// Elimination engine with a bound on the number of pairwise combinations per run.
#[derive(Debug, Clone, Copy)]
pub struct FourierMotzkin {
    max_combinations: usize,
}

impl Default for FourierMotzkin {
    fn default() -> Self {
        Self::new()
    }
}

/// One eliminated variable with the constraints that mentioned it at that point.
struct Step {
    variable: Variable,
    bounds: Vec<LinearInequality>,
}

enum Elimination {
    Done(Vec<LinearInequality>),
    Infeasible,
    GaveUp,
    Interrupted,
}

type Bounds<'a> = SmallVec<&'a LinearInequality, 8>;

impl FourierMotzkin {
    pub const DEFAULT_MAX_COMBINATIONS: usize = 100_000;

    pub fn new() -> Self {
        Self {
            max_combinations: Self::DEFAULT_MAX_COMBINATIONS,
        }
    }

    pub fn with_max_combinations(mut self, max_combinations: usize) -> Self {
        self.max_combinations = max_combinations;
        self
    }

    pub fn check(&self, constraints: &[LinearInequality]) -> Feasibility {
        self.check_interruptible(constraints, &|| false)
    }

    /// Decide integer feasibility, polling `interrupted` before each elimination.
    pub fn check_interruptible(
        &self,
        constraints: &[LinearInequality],
        interrupted: &dyn Fn() -> bool,
    ) -> Feasibility {
        let Some(initial) = normalize(constraints) else {
            return Feasibility::Infeasible;
        };

        let mut steps = Vec::new();
        match self.eliminate_all(initial, None, false, interrupted, &mut steps) {
            Elimination::Infeasible => return Feasibility::Infeasible,
            Elimination::GaveUp => return Feasibility::Unknown,
            Elimination::Interrupted => return Feasibility::Interrupted,
            Elimination::Done(_) => {}
        }

        let Some(mut model) = back_substitute(&steps) else {
            trace!("integer back-substitution failed after {} eliminations", steps.len());
            return Feasibility::Unknown;
        };
        // Variables whose constraints cancelled out were read as zero while substituting.
        for constraint in constraints {
            for variable in constraint.expr().variables() {
                if !model.contains_key(variable) {
                    model.insert(variable.clone(), BigInt::zero());
                }
            }
        }
        let verified = constraints
            .iter()
            .all(|constraint| constraint.holds(&model) == Some(true));
        if verified {
            Feasibility::Feasible(model)
        } else {
            Feasibility::Unknown
        }
    }

    /// Project `constraints` onto `keep`.
    ///
    /// With `exact` set, only eliminations that preserve the integer projection are
    /// allowed (every combined pair has a unit coefficient on one side); `None` is returned
    /// when that is not possible or the combination budget runs out. Without `exact` the
    /// result over-approximates the integer projection. An infeasible system projects to
    /// the single constraint `-1 >= 0`.
    pub fn project(
        &self,
        constraints: &[LinearInequality],
        keep: &BTreeSet<Variable>,
        exact: bool,
    ) -> Option<Vec<LinearInequality>> {
        let Some(initial) = normalize(constraints) else {
            return Some(vec![LinearInequality::contradiction()]);
        };
        let mut steps = Vec::new();
        match self.eliminate_all(initial, Some(keep), exact, &|| false, &mut steps) {
            Elimination::Done(remaining) => Some(remaining),
            Elimination::Infeasible => Some(vec![LinearInequality::contradiction()]),
            Elimination::GaveUp | Elimination::Interrupted => None,
        }
    }

    fn eliminate_all(
        &self,
        mut current: Vec<LinearInequality>,
        keep: Option<&BTreeSet<Variable>>,
        exact: bool,
        interrupted: &dyn Fn() -> bool,
        steps: &mut Vec<Step>,
    ) -> Elimination {
        let mut budget = self.max_combinations;

        while let Some(variable) = pick_variable(&current, keep) {
            if interrupted() {
                return Elimination::Interrupted;
            }

            let (mentioning, mut next): (Vec<_>, Vec<_>) = current
                .into_iter()
                .partition(|constraint| constraint.expr().coefficient(&variable).is_some());

            {
                let mut lowers = Bounds::new();
                let mut uppers = Bounds::new();
                for constraint in &mentioning {
                    match constraint.expr().coefficient(&variable) {
                        Some(coefficient) if coefficient.is_positive() => lowers.push(constraint),
                        Some(_) => uppers.push(constraint),
                        None => {}
                    }
                }

                let pairs = lowers.len() * uppers.len();
                if pairs > budget {
                    trace!("elimination of {variable} needs {pairs} combinations, giving up");
                    return Elimination::GaveUp;
                }
                budget -= pairs;

                for lower in &lowers {
                    for upper in &uppers {
                        let Some(combined) = combine(lower, upper, &variable, exact) else {
                            return Elimination::GaveUp;
                        };
                        match combined.constant_truth() {
                            Some(false) => return Elimination::Infeasible,
                            Some(true) => {}
                            None => next.push(combined),
                        }
                    }
                }
            }

            next.sort();
            next.dedup();
            steps.push(Step {
                variable,
                bounds: mentioning,
            });
            current = next;
        }

        Elimination::Done(current)
    }
}

/// Tighten every constraint and drop the trivially true ones; `None` if one is trivially
/// false.
fn normalize(constraints: &[LinearInequality]) -> Option<Vec<LinearInequality>> {
    let mut normalized = Vec::with_capacity(constraints.len());
    for constraint in constraints {
        let tight = constraint.tightened();
        match tight.constant_truth() {
            Some(false) => return None,
            Some(true) => {}
            None => normalized.push(tight),
        }
    }
    normalized.sort();
    normalized.dedup();
    Some(normalized)
}

/// Cheapest variable to eliminate: fewest lower/upper bound pairs, first one on ties.
fn pick_variable(constraints: &[LinearInequality], keep: Option<&BTreeSet<Variable>>) -> Option<Variable> {
    let candidates: BTreeSet<&Variable> = constraints
        .iter()
        .flat_map(|constraint| constraint.expr().variables())
        .filter(|variable| keep.is_none_or(|keep| !keep.contains(*variable)))
        .collect();

    let mut best: Option<(usize, &Variable)> = None;
    for variable in candidates {
        let (mut lowers, mut uppers) = (0usize, 0usize);
        for constraint in constraints {
            match constraint.expr().coefficient(variable) {
                Some(coefficient) if coefficient.is_positive() => lowers += 1,
                Some(_) => uppers += 1,
                None => {}
            }
        }
        let cost = lowers * uppers;
        if best.is_none_or(|(best_cost, _)| cost < best_cost) {
            best = Some((cost, variable));
        }
    }
    best.map(|(_, variable)| variable.clone())
}

/// `|a_u| * lower + a_l * upper`, which no longer mentions `variable`.
fn combine(
    lower: &LinearInequality,
    upper: &LinearInequality,
    variable: &Variable,
    exact: bool,
) -> Option<LinearInequality> {
    let a_lower = lower.expr().coefficient(variable)?;
    let a_upper = -upper.expr().coefficient(variable)?;
    if exact && !a_lower.is_one() && !a_upper.is_one() {
        return None;
    }
    let mut expr = lower.expr().scale(&a_upper);
    expr.add_scaled(upper.expr(), a_lower);
    Some(LinearInequality::non_strict(expr).tightened())
}

/// Values tried per variable before backtracking into the previous one.
const CANDIDATES_PER_VARIABLE: usize = 8;

/// Total number of assignments tried during back-substitution.
const BACKTRACK_BUDGET: usize = 4096;

/// Assign eliminated variables in reverse elimination order. Each variable takes values
/// inside the bounds implied by the already assigned ones, closest to zero first; a
/// dead end backtracks into the previously assigned variable.
fn back_substitute(steps: &[Step]) -> Option<Model> {
    let mut model = Model::new();
    let mut budget = BACKTRACK_BUDGET;
    assign(steps, &mut model, &mut budget).then_some(model)
}

fn assign(steps: &[Step], model: &mut Model, budget: &mut usize) -> bool {
    let Some((step, rest)) = steps.split_last() else {
        return true;
    };
    let (lo, hi) = variable_bounds(step, model);
    if let (Some(lo), Some(hi)) = (&lo, &hi)
        && lo > hi
    {
        return false;
    }

    for value in candidates(lo, hi).take(CANDIDATES_PER_VARIABLE) {
        if *budget == 0 {
            break;
        }
        *budget -= 1;
        model.insert(step.variable.clone(), value);
        if assign(rest, model, budget) {
            return true;
        }
    }
    model.remove(&step.variable);
    false
}

fn variable_bounds(step: &Step, model: &Model) -> (Option<BigInt>, Option<BigInt>) {
    let mut lo: Option<BigInt> = None;
    let mut hi: Option<BigInt> = None;
    for bound in &step.bounds {
        let Some(coefficient) = bound.expr().coefficient(&step.variable) else {
            continue;
        };
        let rest = bound.expr().eval_without(&step.variable, model);
        if coefficient.is_positive() {
            // a*x + rest >= 0  ~>  x >= ceil(-rest / a)
            let candidate = ceil_div(&-rest, coefficient);
            lo = Some(lo.map_or(candidate.clone(), |lo| lo.max(candidate)));
        } else {
            // -a*x + rest >= 0  ~>  x <= floor(rest / a)
            let candidate = floor_div(&rest, &-coefficient);
            hi = Some(hi.map_or(candidate.clone(), |hi| hi.min(candidate)));
        }
    }
    (lo, hi)
}

/// Integers of `[lo, hi]` ordered by distance to the one closest to zero.
fn candidates(lo: Option<BigInt>, hi: Option<BigInt>) -> impl Iterator<Item = BigInt> {
    let start = match (&lo, &hi) {
        (Some(lo), _) if lo.is_positive() => lo.clone(),
        (_, Some(hi)) if hi.is_negative() => hi.clone(),
        _ => BigInt::zero(),
    };
    let within = move |value: &BigInt| {
        lo.as_ref().is_none_or(|lo| value >= lo) && hi.as_ref().is_none_or(|hi| value <= hi)
    };
    // Offsets 0, +1, -1, +2, -2, ...; two misses in a row mean both sides left the range.
    let mut step = 0u64;
    let mut misses = 0u8;
    std::iter::from_fn(move || {
        while misses < 2 {
            let offset = if step % 2 == 1 {
                BigInt::from(step.div_ceil(2))
            } else {
                -BigInt::from(step / 2)
            };
            step += 1;
            let value = &start + offset;
            if within(&value) {
                misses = 0;
                return Some(value);
            }
            misses += 1;
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::{CmpOp, Formula, Term, ops::*},
        linear::Polyhedron,
    };

    fn x() -> Term {
        Term::var("x")
    }

    fn y() -> Term {
        Term::var("y")
    }

    fn constraints(clause: Formula) -> Vec<LinearInequality> {
        Polyhedron::from_clause(&clause).unwrap().constraints().to_vec()
    }

    #[test]
    fn detects_rational_infeasibility() {
        let system = constraints(gt(x(), y()) & gt(y(), x()));
        assert_eq!(FourierMotzkin::new().check(&system), Feasibility::Infeasible);
    }

    #[test]
    fn detects_integer_gaps_through_tightening() {
        // 2 < 2x < 4 has rational but no integer solutions
        let system = constraints(lt(Term::int(2), x() * 2) & lt(x() * 2, Term::int(4)));
        assert_eq!(FourierMotzkin::new().check(&system), Feasibility::Infeasible);
    }

    #[test]
    fn feasible_systems_come_with_a_model() {
        let system = constraints(ge(x(), 3) & le(x() + y(), 10) & gt(y(), x()));
        let Feasibility::Feasible(model) = FourierMotzkin::new().check(&system) else {
            panic!("expected a model");
        };
        assert!(system.iter().all(|c| c.holds(&model) == Some(true)));
    }

    #[test]
    fn variables_that_cancel_out_still_get_a_value() {
        // eliminating x from x >= y /\ y >= x leaves nothing that mentions y
        let system = constraints(ge(x(), y()) & ge(y(), x()));
        let Feasibility::Feasible(model) = FourierMotzkin::new().check(&system) else {
            panic!("expected a model");
        };
        assert_eq!(model.get(&Variable::new("x")), model.get(&Variable::new("y")));
        assert!(system.iter().all(|c| c.holds(&model) == Some(true)));

        let shifted = constraints(ge(x(), y() + 2) & le(x(), y() + 2) & ge(y(), 5));
        let Feasibility::Feasible(model) = FourierMotzkin::new().check(&shifted) else {
            panic!("expected a model");
        };
        assert!(shifted.iter().all(|c| c.holds(&model) == Some(true)));
    }

    #[test]
    fn budget_exhaustion_is_unknown() {
        let system = constraints(ge(x(), 0) & ge(x(), y()) & le(x(), 5) & le(x(), y() + 3));
        assert_eq!(
            FourierMotzkin::new().with_max_combinations(1).check(&system),
            Feasibility::Unknown
        );
    }

    #[test]
    fn interruption_is_reported() {
        let system = constraints(ge(x(), 0));
        assert_eq!(
            FourierMotzkin::new().check_interruptible(&system, &|| true),
            Feasibility::Interrupted
        );
    }

    #[test]
    fn exact_projection_keeps_integer_shadow() {
        // y = x + 1 with 0 <= x <= 3 projects onto 1 <= y <= 4
        let system = constraints(ge(y(), x() + 1) & le(y(), x() + 1) & ge(x(), 0) & le(x(), 3));
        let keep = BTreeSet::from([Variable::new("y")]);
        let projected = FourierMotzkin::new().project(&system, &keep, true).unwrap();
        let holds = |value: i64| {
            let model = Model::from([(Variable::new("y"), BigInt::from(value))]);
            projected.iter().all(|c| c.holds(&model) == Some(true))
        };
        assert!((1..=4).all(holds));
        assert!(!holds(0) && !holds(5));
    }

    #[test]
    fn exact_projection_refuses_non_unit_pairs() {
        let system = vec![
            LinearInequality::from_comparison(CmpOp::Ge, &(x() * 2), &y()).unwrap(),
            LinearInequality::from_comparison(CmpOp::Le, &(x() * 3), &(y() + 1)).unwrap(),
        ];
        let keep = BTreeSet::from([Variable::new("y")]);
        assert_eq!(FourierMotzkin::new().project(&system, &keep, true), None);
        assert!(FourierMotzkin::new().project(&system, &keep, false).is_some());
    }
}
