use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use lrformal::prelude::Variable;

use crate::{
    ranking::RankingRelation,
    synthesis::TerminationArgument,
    utils::error::{LrError, LrResult},
};

/// Translates synthesized termination arguments into [`RankingRelation`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingRelationBuilder;

impl RankingRelationBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Relation over `x` (pre-state) and `x'` (post-state) for every `x` in `relevant`.
    ///
    /// Fails when the argument mentions a variable outside `relevant`.
    pub fn from_termination_argument(
        &self,
        argument: &TerminationArgument,
        relevant: &BTreeSet<String>,
    ) -> LrResult<RankingRelation> {
        let mentioned = argument
            .ranking_function
            .variable_names()
            .into_iter()
            .chain(
                argument
                    .supporting_invariants
                    .iter()
                    .flat_map(|invariant| invariant.function.variable_names()),
            );
        for name in mentioned {
            if !relevant.contains(name) {
                return Err(LrError::RankingRelation(format!(
                    "argument `{argument}` mentions `{name}`, which is not relevant for termination"
                )));
            }
        }

        let pre: BTreeMap<String, Variable> = relevant
            .iter()
            .map(|name| (name.clone(), Variable::new(name.as_str())))
            .collect();
        let post: BTreeMap<String, Variable> = relevant
            .iter()
            .map(|name| (name.clone(), Variable::primed(name)))
            .collect();

        let condition = argument
            .ranking_function
            .decrease_condition(&pre, &post)
            .ok_or_else(|| {
                LrError::RankingRelation(format!("cannot instantiate `{argument}`"))
            })?;
        let invariants = argument
            .supporting_invariants
            .iter()
            .map(|invariant| {
                invariant.instantiate(&pre).ok_or_else(|| {
                    LrError::RankingRelation(format!("cannot instantiate invariant `{invariant}`"))
                })
            })
            .collect::<LrResult<Vec<_>>>()?;

        let relation = RankingRelation::new(condition).with_supporting_invariants(invariants);
        debug!("ranking relation {relation} from {argument}");
        Ok(relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::{AffineFunction, RankingFunction, RankingTemplate, SupportingInvariant};
    use lrformal::prelude::*;

    fn affine(name: &str) -> AffineFunction {
        AffineFunction::new(LinearExpr::variable(Variable::new(name))).unwrap()
    }

    fn argument(name: &str) -> TerminationArgument {
        TerminationArgument {
            ranking_function: RankingFunction::new(RankingTemplate::Affine, vec![affine(name)])
                .unwrap(),
            supporting_invariants: vec![SupportingInvariant {
                function: affine(name),
                strict: false,
            }],
        }
    }

    #[test]
    fn relation_uses_primed_post_state() {
        let relevant = BTreeSet::from(["x".to_string(), "y".to_string()]);
        let relation = RankingRelationBuilder::new()
            .from_termination_argument(&argument("x"), &relevant)
            .unwrap();
        assert_eq!(relation.as_formula().to_string(), "x >= x' + 1 /\\ x >= 1");
        assert_eq!(
            relation.supporting_invariants(),
            &BTreeSet::from([ge(Term::var("x"), 0)])
        );
    }

    #[test]
    fn unknown_variables_are_rejected() {
        let relevant = BTreeSet::from(["x".to_string()]);
        assert!(matches!(
            RankingRelationBuilder::new().from_termination_argument(&argument("z"), &relevant),
            Err(LrError::RankingRelation(_))
        ));
    }
}
