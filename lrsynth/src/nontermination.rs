//! Recurrent sets from exact projections.
//!
//! For a loop polyhedron `P(in, out)` the set `G(in) = exists out. P(in, out)` contains
//! exactly the states that can take a `P` step. If no loop step leaves `G`, every state
//! in `G` runs forever; a reachable state in `G` is then a witness. When the first
//! candidate is not closed it is strengthened backwards,
//! `G'(in) = G(in) /\ exists out. P(in, out) /\ G(out)`, a bounded number of times.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use lrcore::{
    lasso::Lasso,
    provers::{SatResult, Solver},
    synthesis::{NonTerminationArgument, NonTerminationSynthesizer, State, SynthesisResult},
    utils::error::LrResult,
};
use lrformal::prelude::{Formula, FourierMotzkin, LinearInequality, Model, Polyhedron, Variable};

use crate::candidates::{instance_names, interruption};

pub struct RecurrentSetGuesser<'a> {
    lasso: &'a Lasso,
    solver: &'a dyn Solver,
    refinements: usize,
    engine: FourierMotzkin,
    argument: Option<NonTerminationArgument>,
}

impl<'a> RecurrentSetGuesser<'a> {
    pub fn new(lasso: &'a Lasso, solver: &'a dyn Solver, refinements: usize) -> Self {
        Self {
            lasso,
            solver,
            refinements,
            engine: FourierMotzkin::new(),
            argument: None,
        }
    }

    fn check(
        &self,
        formulas: impl IntoIterator<Item = Formula>,
    ) -> LrResult<(SatResult, Option<Model>)> {
        if self.solver.is_interrupted() {
            return Err(interruption());
        }
        let mut prover = self.solver.new_prover()?;
        for formula in formulas {
            prover.push(formula)?;
        }
        let result = prover.check()?;
        Ok((result, prover.model().cloned()))
    }

    /// Instances the loop reads and writes, by entry instance.
    fn boundary(&self) -> BTreeMap<Variable, Variable> {
        let looped = &self.lasso.loop_transition;
        looped
            .in_vars
            .iter()
            .filter_map(|(name, entry)| Some((entry.clone(), looped.out_vars.get(name)?.clone())))
            .collect()
    }

    /// Whether `polyhedron` only mentions auxiliary variables and instances of the
    /// program variables the lasso exposes.
    fn only_exposed(&self, polyhedron: &Polyhedron) -> bool {
        let looped = &self.lasso.loop_transition;
        polyhedron.variables().iter().all(|variable| {
            variable.is_auxiliary()
                || looped.in_vars.contains_key(variable.name())
                || looped.out_vars.contains_key(variable.name())
        })
    }

    /// Closed candidate derived from `polyhedron`, if one is found.
    fn recurrent_set(
        &self,
        polyhedron: &Polyhedron,
        boundary: &BTreeMap<Variable, Variable>,
    ) -> LrResult<Option<Vec<LinearInequality>>> {
        let keep: BTreeSet<Variable> = boundary.keys().cloned().collect();
        let transition = self.lasso.loop_transition.to_formula();

        let Some(mut set) = self.engine.project(polyhedron.constraints(), &keep, true) else {
            trace!("no exact projection of {polyhedron}");
            return Ok(None);
        };
        for round in 0..=self.refinements {
            let entry = conjunction(&set);
            let exit = conjunction(&rename_all(&set, boundary));
            let (closed, _) = self.check([transition.clone(), entry, !exit])?;
            if closed.is_unsat() {
                trace!("recurrent set closed after {round} refinements");
                return Ok(Some(set));
            }

            let mut constraints = polyhedron.constraints().to_vec();
            constraints.extend(rename_all(&set, boundary));
            let Some(stronger) = self.engine.project(&constraints, &keep, true) else {
                return Ok(None);
            };
            set.extend(stronger);
            set.sort();
            set.dedup();
        }
        Ok(None)
    }

    /// A stem model inside `set`, as a state over program variable names.
    fn entry_state(&self, set: &[LinearInequality]) -> LrResult<Option<State>> {
        let stem = &self.lasso.stem;
        let looped = &self.lasso.loop_transition;
        let at_stem_exit: BTreeMap<Variable, Variable> = looped
            .in_vars
            .iter()
            .filter_map(|(name, entry)| Some((entry.clone(), stem.out_vars.get(name)?.clone())))
            .collect();
        let reached = rename_all(set, &at_stem_exit);

        let (result, model) = self.check([stem.to_formula(), conjunction(&reached)])?;
        let (SatResult::Sat, Some(model)) = (result, model) else {
            return Ok(None);
        };
        let state = looped
            .in_vars
            .iter()
            .map(|(name, entry)| {
                let instance = at_stem_exit.get(entry).unwrap_or(entry);
                (name.clone(), model.get(instance).cloned().unwrap_or_default())
            })
            .collect();
        Ok(Some(state))
    }
}

impl NonTerminationSynthesizer for RecurrentSetGuesser<'_> {
    fn synthesize(&mut self) -> LrResult<SynthesisResult> {
        self.argument = None;
        let boundary = self.boundary();
        let names = instance_names(&self.lasso.loop_transition.in_vars);

        for polyhedron in &self.lasso.loop_transition.polyhedra {
            if !self.only_exposed(polyhedron) {
                trace!("skipping {polyhedron}: it constrains variables outside the lasso");
                continue;
            }
            let Some(set) = self.recurrent_set(polyhedron, &boundary)? else {
                continue;
            };
            let Some(initial) = self.entry_state(&set)? else {
                trace!("recurrent set is not reachable from the stem");
                continue;
            };
            let set = conjunction(&rename_all(&set, &names));
            let argument = NonTerminationArgument::RecurrentSet { initial, set };
            debug!("found {argument}");
            self.argument = Some(argument);
            return Ok(SynthesisResult::Sat);
        }
        Ok(SynthesisResult::Unknown)
    }

    fn synthesis_successful(&self) -> bool {
        self.argument.is_some()
    }

    fn argument(&self) -> Option<&NonTerminationArgument> {
        self.argument.as_ref()
    }
}

fn rename_all(
    constraints: &[LinearInequality],
    mapping: &BTreeMap<Variable, Variable>,
) -> Vec<LinearInequality> {
    constraints.iter().map(|c| c.rename(mapping)).collect()
}

fn conjunction(constraints: &[LinearInequality]) -> Formula {
    Formula::and(constraints.iter().map(LinearInequality::to_formula))
}
