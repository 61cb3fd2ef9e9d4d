//! Ranking functions guessed from loop guards.
//!
//! A guard `g(x) >= 0` over entry instances only is a natural measure: `g + 1` is at
//! least one whenever the loop runs. For a nested template the same candidates are
//! tried in every order. Stem constraints that the loop preserves may be added as
//! supporting invariants when the plain check fails.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use lrcore::{
    lasso::{Lasso, LinearTransition},
    provers::Solver,
    synthesis::{
        AffineFunction, RankingFunction, RankingTemplate, SupportingInvariant,
        SynthesisResult, TerminationArgument, TerminationSettings, TerminationSynthesizer,
    },
    utils::error::LrResult,
};
use lrformal::prelude::{Formula, LinearExpr, LinearInequality, Variable};
use smallvec::SmallVec;

use crate::candidates::{instance_names, interruption};

type Choice = SmallVec<usize, 4>;

pub struct TemplateGuesser<'a> {
    lasso: &'a Lasso,
    solver: &'a dyn Solver,
    template: RankingTemplate,
    non_strict_invariants: usize,
    strict_invariants: usize,
    guess_invariants: bool,
    max_candidates: usize,
    argument: Option<TerminationArgument>,
}

impl<'a> TemplateGuesser<'a> {
    pub fn new(
        lasso: &'a Lasso,
        solver: &'a dyn Solver,
        settings: &TerminationSettings,
        guess_invariants: bool,
        max_candidates: usize,
    ) -> Self {
        Self {
            lasso,
            solver,
            template: settings.template,
            non_strict_invariants: settings.non_strict_invariants,
            strict_invariants: settings.strict_invariants,
            guess_invariants,
            max_candidates,
            argument: None,
        }
    }

    fn is_unsat(&self, formulas: impl IntoIterator<Item = Formula>) -> LrResult<bool> {
        if self.solver.is_interrupted() {
            return Err(interruption());
        }
        let mut prover = self.solver.new_prover()?;
        for formula in formulas {
            prover.push(formula)?;
        }
        prover.is_unsat()
    }

    /// Stem constraints over program variables that hold on loop entry and are
    /// preserved by every loop iteration.
    fn supporting_invariants(&self) -> LrResult<Vec<SupportingInvariant>> {
        if !self.guess_invariants {
            return Ok(Vec::new());
        }
        let stem = &self.lasso.stem;
        let looped = &self.lasso.loop_transition;
        let names = instance_names(&stem.out_vars);

        let mut candidates = BTreeSet::new();
        for constraint in stem.polyhedra.iter().flat_map(|p| p.constraints()) {
            if let Some(function) = over_names(constraint.expr(), &names) {
                candidates.insert(SupportingInvariant {
                    function,
                    strict: constraint.is_strict(),
                });
            }
        }

        let transition = looped.to_formula();
        let (mut non_strict, mut strict) = (0, 0);
        let mut accepted = Vec::new();
        for invariant in candidates {
            let budget = if invariant.strict {
                &mut strict
            } else {
                &mut non_strict
            };
            let limit = if invariant.strict {
                self.strict_invariants
            } else {
                self.non_strict_invariants
            };
            if *budget >= limit {
                continue;
            }
            let (Some(at_entry), Some(before), Some(after)) = (
                invariant.instantiate(&stem.out_vars),
                invariant.instantiate(&looped.in_vars),
                invariant.instantiate(&looped.out_vars),
            ) else {
                continue;
            };
            if self.is_unsat([stem.to_formula(), !at_entry])?
                && self.is_unsat([transition.clone(), before, !after])?
            {
                trace!("supporting invariant {invariant}");
                *budget += 1;
                accepted.push(invariant);
            }
        }
        Ok(accepted)
    }

    fn decreases(
        &self,
        ranking: &RankingFunction,
        invariants: &[SupportingInvariant],
    ) -> LrResult<bool> {
        let looped = &self.lasso.loop_transition;
        let Some(condition) = ranking.decrease_condition(&looped.in_vars, &looped.out_vars) else {
            return Ok(false);
        };
        let Some(assumptions) = invariants
            .iter()
            .map(|invariant| invariant.instantiate(&looped.in_vars))
            .collect::<Option<Vec<_>>>()
        else {
            return Ok(false);
        };
        self.is_unsat(
            std::iter::once(looped.to_formula())
                .chain(assumptions)
                .chain(std::iter::once(!condition)),
        )
    }

    fn search(&self, candidates: &[AffineFunction]) -> LrResult<Option<TerminationArgument>> {
        let choices = choices(candidates.len(), self.template.size(), self.max_candidates);
        debug!(
            "{} {} ranking candidates from {} loop guards",
            choices.len(),
            self.template,
            candidates.len()
        );

        let rankings = choices
            .iter()
            .map(|choice| {
                let functions = choice.iter().map(|&i| candidates[i].clone()).collect();
                RankingFunction::new(self.template, functions)
            })
            .collect::<LrResult<Vec<_>>>()?;

        for ranking in &rankings {
            if self.decreases(ranking, &[])? {
                return Ok(Some(TerminationArgument {
                    ranking_function: ranking.clone(),
                    supporting_invariants: Vec::new(),
                }));
            }
        }

        let invariants = self.supporting_invariants()?;
        if invariants.is_empty() {
            return Ok(None);
        }
        for ranking in &rankings {
            if self.decreases(ranking, &invariants)? {
                return Ok(Some(TerminationArgument {
                    ranking_function: ranking.clone(),
                    supporting_invariants: invariants,
                }));
            }
        }
        Ok(None)
    }
}

impl TerminationSynthesizer for TemplateGuesser<'_> {
    fn synthesize(&mut self) -> LrResult<SynthesisResult> {
        self.argument = None;
        let candidates = guard_candidates(&self.lasso.loop_transition);
        if candidates.len() < self.template.size() {
            trace!(
                "{} guards are too few for the {} template",
                candidates.len(),
                self.template
            );
            return Ok(SynthesisResult::Unknown);
        }

        self.argument = self.search(&candidates)?;
        Ok(match &self.argument {
            Some(argument) => {
                debug!("found {argument}");
                SynthesisResult::Sat
            }
            None => SynthesisResult::Unknown,
        })
    }

    fn synthesis_successful(&self) -> bool {
        self.argument.is_some()
    }

    fn argument(&self) -> Option<&TerminationArgument> {
        self.argument.as_ref()
    }
}

/// `g + 1` for each non-constant guard `g >= 0` (or `g` for `g > 0`) over entry instances
/// of variables the loop exposes at both ends.
fn guard_candidates(looped: &LinearTransition) -> Vec<AffineFunction> {
    let names: BTreeMap<Variable, Variable> = instance_names(&looped.in_vars)
        .into_iter()
        .filter(|(_, name)| looped.out_vars.contains_key(name.name()))
        .collect();

    let mut candidates = BTreeSet::new();
    for constraint in looped.polyhedra.iter().flat_map(|p| p.constraints()) {
        let Some(function) = over_names(&measure(constraint), &names) else {
            continue;
        };
        candidates.insert(function);
    }
    candidates.into_iter().collect()
}

fn measure(guard: &LinearInequality) -> LinearExpr {
    if guard.is_strict() {
        guard.expr().clone()
    } else {
        guard.expr() + &LinearExpr::constant(1)
    }
}

/// `expr` over bare names, when every variable of it is one of the instances of `names`.
fn over_names(expr: &LinearExpr, names: &BTreeMap<Variable, Variable>) -> Option<AffineFunction> {
    if expr.is_constant() || expr.variables().any(|v| !names.contains_key(v)) {
        return None;
    }
    AffineFunction::new(expr.rename(names)).ok()
}

/// Ordered selections of `size` distinct indices below `count`, at most `limit` of them.
fn choices(count: usize, size: usize, limit: usize) -> Vec<Choice> {
    fn extend(count: usize, size: usize, limit: usize, current: &mut Choice, out: &mut Vec<Choice>) {
        if out.len() >= limit {
            return;
        }
        if current.len() == size {
            out.push(current.clone());
            return;
        }
        for i in 0..count {
            if !current.contains(&i) {
                current.push(i);
                extend(count, size, limit, current, out);
                current.pop();
            }
        }
    }

    let mut out = Vec::new();
    extend(count, size, limit, &mut Choice::new(), &mut out);
    out
}
