//! Ranking relations: the certificates of a terminating loop, usable as formulas.
//!
//! A relation talks about uninstantiated pre-state variables (`x`) and primed
//! post-state variables (`x'`). [`RankingRelation::instantiate`] moves it onto the
//! instances of a concrete transition.

pub mod builder;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use lrformal::prelude::{Formula, Term, Variable};

use crate::{
    provers::Solver,
    utils::error::{LrError, LrResult},
};

pub use builder::RankingRelationBuilder;

/// Disjunction of ranking conditions plus the invariants they rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RankingRelation {
    conditions: BTreeSet<Formula>,
    invariants: BTreeSet<Formula>,
}

impl RankingRelation {
    pub fn new(condition: Formula) -> Self {
        Self {
            conditions: BTreeSet::from([condition]),
            invariants: BTreeSet::new(),
        }
    }

    pub fn from_conditions(conditions: impl IntoIterator<Item = Formula>) -> LrResult<Self> {
        let conditions: BTreeSet<Formula> = conditions.into_iter().collect();
        if conditions.is_empty() {
            return Err(LrError::InvalidArgument(
                "a ranking relation needs at least one condition".to_string(),
            ));
        }
        Ok(Self {
            conditions,
            invariants: BTreeSet::new(),
        })
    }

    pub fn conditions(&self) -> &BTreeSet<Formula> {
        &self.conditions
    }

    pub fn supporting_invariants(&self) -> &BTreeSet<Formula> {
        &self.invariants
    }

    /// Disjunction of all ranking conditions.
    pub fn as_formula(&self) -> Formula {
        debug_assert!(!self.conditions.is_empty());
        Formula::or(self.conditions.iter().cloned())
    }

    /// Union of conditions and invariants.
    pub fn merge(&self, other: &RankingRelation) -> RankingRelation {
        RankingRelation {
            conditions: self.conditions.union(&other.conditions).cloned().collect(),
            invariants: self.invariants.union(&other.invariants).cloned().collect(),
        }
    }

    pub fn with_supporting_invariants(
        &self,
        invariants: impl IntoIterator<Item = Formula>,
    ) -> RankingRelation {
        let mut extended = self.clone();
        extended.invariants.extend(invariants);
        extended
    }

    /// [`Self::as_formula`] imported into the context of `solver`.
    pub fn as_formula_from_other_solver(&self, solver: &dyn Solver) -> Formula {
        solver.import_formula(&self.as_formula())
    }

    /// Ranking conditions and supporting invariants over the instances of a transition.
    ///
    /// Names missing from `pre` or `post` stay as they are, which leaves them
    /// unconstrained.
    pub fn instantiate(
        &self,
        pre: &BTreeMap<String, Variable>,
        post: &BTreeMap<String, Variable>,
    ) -> (Formula, Formula) {
        let mut mapping = BTreeMap::new();
        for (name, instance) in pre {
            mapping.insert(Variable::new(name.as_str()), Term::Var(instance.clone()));
        }
        for (name, instance) in post {
            mapping.insert(Variable::primed(name), Term::Var(instance.clone()));
        }
        let conditions = self.as_formula().substitute(&mapping);
        let invariants = Formula::and(self.invariants.iter().cloned()).substitute(&mapping);
        (conditions, invariants)
    }
}

impl fmt::Display for RankingRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_formula())?;
        if !self.invariants.is_empty() {
            write!(
                f,
                " assuming {}",
                Formula::and(self.invariants.iter().cloned())
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrformal::prelude::*;

    fn x() -> Term {
        Term::var("x")
    }

    fn x_post() -> Term {
        Term::Var(Variable::primed("x"))
    }

    #[test]
    fn single_condition_is_the_formula() {
        let condition = gt(x(), x_post());
        let relation = RankingRelation::new(condition.clone());
        assert_eq!(relation.as_formula(), condition);
        assert!(relation.supporting_invariants().is_empty());
        assert!(RankingRelation::from_conditions([]).is_err());
    }

    #[test]
    fn instantiation_moves_onto_transition_instances() {
        let relation = RankingRelation::new(gt(x(), x_post()))
            .with_supporting_invariants([ge(x(), 0)]);
        let pre = BTreeMap::from([("x".to_string(), Variable::indexed("x", 2))]);
        let post = BTreeMap::from([("x".to_string(), Variable::indexed("x", 3))]);
        let (conditions, invariants) = relation.instantiate(&pre, &post);
        assert_eq!(conditions.to_string(), "x@2 > x@3");
        assert_eq!(invariants.to_string(), "x@2 >= 0");
    }

    #[test]
    fn display_mentions_invariants() {
        let relation = RankingRelation::new(gt(x(), x_post()))
            .with_supporting_invariants([ge(x(), 0)]);
        assert_eq!(relation.to_string(), "x > x' assuming x >= 0");
    }
}
