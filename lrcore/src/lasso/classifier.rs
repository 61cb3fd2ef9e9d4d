use std::collections::BTreeSet;

use lrformal::prelude::{Formula, Variable};

use crate::cfa::SsaMap;

/// Split the free variables of `formula` into the instances visible at the entry
/// (`in_ssa`) and at the exit (`out_ssa`) of a transition.
///
/// An instance may be both (read but never written) or neither (an intermediate write).
pub fn classify_variables(
    formula: &Formula,
    in_ssa: &SsaMap,
    out_ssa: &SsaMap,
) -> (BTreeSet<Variable>, BTreeSet<Variable>) {
    let mut in_vars = BTreeSet::new();
    let mut out_vars = BTreeSet::new();
    for variable in formula.variables() {
        if !in_ssa.is_intermediate(&variable) {
            in_vars.insert(variable.clone());
        }
        if !out_ssa.is_intermediate(&variable) {
            out_vars.insert(variable);
        }
    }
    (in_vars, out_vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfa::SsaMapBuilder;
    use lrformal::prelude::*;

    fn ssa(entries: &[(&str, u32)]) -> SsaMap {
        let mut builder = SsaMapBuilder::new();
        for (name, index) in entries {
            builder.set(*name, *index);
        }
        builder.build()
    }

    fn instance(name: &str, index: u32) -> Term {
        Term::Var(Variable::indexed(name, index))
    }

    #[test]
    fn loop_instances_split_at_the_boundaries() {
        // x@2 > 0 /\ x@3 = x@2 - 1 /\ x@4 = x@3 + y@1
        let formula = gt(instance("x", 2), 0)
            & eq(instance("x", 3), instance("x", 2) - 1)
            & eq(instance("x", 4), instance("x", 3) + instance("y", 1));
        let (in_vars, out_vars) = classify_variables(
            &formula,
            &ssa(&[("x", 2), ("y", 1)]),
            &ssa(&[("x", 4), ("y", 1)]),
        );

        assert_eq!(
            in_vars,
            BTreeSet::from([Variable::indexed("x", 2), Variable::indexed("y", 1)])
        );
        assert_eq!(
            out_vars,
            BTreeSet::from([Variable::indexed("x", 4), Variable::indexed("y", 1)])
        );
    }

    #[test]
    fn empty_entry_map_hides_every_instance() {
        let formula = eq(instance("x", 2), 5) & gt(Term::var("n"), 0);
        let (in_vars, out_vars) = classify_variables(&formula, &SsaMap::empty(), &ssa(&[("x", 2)]));
        assert_eq!(in_vars, BTreeSet::from([Variable::new("n")]));
        assert_eq!(
            out_vars,
            BTreeSet::from([Variable::new("n"), Variable::indexed("x", 2)])
        );
    }
}
