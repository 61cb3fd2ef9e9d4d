use std::collections::HashSet;

use log::warn;

use crate::{
    expr::Formula,
    walker::{Rewriter, rewrite_formula},
};

/// Result of a bounded DNF conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dnf {
    pub formula: Formula,
    /// Whether some conjunction was left unexpanded because of the clause bound.
    pub gave_up: bool,
}

/// Disjunctive normal form of a formula in negation normal form.
///
/// Conjunctions are expanded bottom-up by distributing each conjunct's disjuncts over
/// the clauses collected so far. When a cross product would exceed `max_clauses`
/// clauses, the conjunction is returned unexpanded (with its children in DNF) and the
/// result is flagged with [`Dnf::gave_up`]; the output is equivalent to the input in
/// both cases.
pub fn to_dnf(formula: &Formula, max_clauses: usize) -> Dnf {
    let mut pass = DnfTransformation {
        max_clauses,
        gave_up: false,
    };
    let formula = rewrite_formula(formula.clone(), &mut pass);
    Dnf {
        formula,
        gave_up: pass.gave_up,
    }
}

struct DnfTransformation {
    max_clauses: usize,
    gave_up: bool,
}

impl Rewriter for DnfTransformation {
    fn rewrite_and(&mut self, args: Vec<Formula>) -> Formula {
        let mut clauses: Vec<Vec<Formula>> = vec![Vec::new()];
        for arg in &args {
            let disjuncts: Vec<&Formula> = arg.disjuncts().collect();
            let expanded = clauses.len().saturating_mul(disjuncts.len());
            if expanded > self.max_clauses {
                warn!(
                    "DNF expansion would produce {expanded} clauses (bound {}), keeping the conjunction",
                    self.max_clauses
                );
                self.gave_up = true;
                return Formula::And(args);
            }

            let mut next = Vec::with_capacity(expanded);
            for clause in &clauses {
                for disjunct in &disjuncts {
                    let mut extended = clause.clone();
                    extended.extend(disjunct.conjuncts().cloned());
                    next.push(extended);
                }
            }
            clauses = next;
        }

        disjunction(clauses.into_iter().map(Formula::and).collect())
    }

    fn rewrite_or(&mut self, args: Vec<Formula>) -> Formula {
        disjunction(args.into_iter().flat_map(Formula::into_disjuncts).collect())
    }
}

/// Disjunction of `args` without duplicates, keeping first occurrences in order.
fn disjunction(args: Vec<Formula>) -> Formula {
    let mut seen = HashSet::with_capacity(args.len());
    Formula::or(args.into_iter().filter(|arg| seen.insert(arg.clone())))
}
