use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, trace, warn};
use lrformal::{
    normalize::{DEFAULT_MAX_DNF_CLAUSES, FormulaNormalizer},
    prelude::{Formula, Polyhedron, Variable},
};

use crate::{
    cfa::{PathFormula, PathFormulaManager, PathPosition, SsaMap, SsaMapBuilder},
    lasso::{Lasso, LinearTransition, classify_variables},
    provers::Solver,
    utils::{
        error::{LrError, LrResult},
        shutdown::ShutdownNotifier,
    },
};

/// Lassos extracted from one counterexample path.
#[derive(Debug, Clone, Default)]
pub struct BuiltLassos {
    pub lassos: Vec<Lasso>,
    /// Feasible stem/loop pairs that could not be linearized.
    pub unsupported: usize,
}

/// Turns counterexample paths into [`Lasso`]s.
pub struct LassoBuilder<'a, M: PathFormulaManager> {
    solver: &'a dyn Solver,
    path_formulas: &'a M,
    shutdown: &'a ShutdownNotifier,
    max_dnf_clauses: usize,
}

/// Loop formula plus the index every variable had when the loop first touched it.
struct LoopFormula {
    formula: PathFormula,
    entry_ssa: SsaMap,
}

impl<'a, M: PathFormulaManager> LassoBuilder<'a, M> {
    pub fn new(solver: &'a dyn Solver, path_formulas: &'a M, shutdown: &'a ShutdownNotifier) -> Self {
        Self {
            solver,
            path_formulas,
            shutdown,
            max_dnf_clauses: DEFAULT_MAX_DNF_CLAUSES,
        }
    }

    pub fn with_max_dnf_clauses(mut self, max_dnf_clauses: usize) -> Self {
        self.max_dnf_clauses = max_dnf_clauses;
        self
    }

    /// Build one lasso per feasible pair of stem clause and loop clause.
    ///
    /// Only variables named in `relevant` become rank variables. Pairs that do not
    /// linearize are counted in [`BuiltLassos::unsupported`] instead of failing the path.
    pub fn build_lassos(
        &self,
        path: &[PathPosition<M::Edge>],
        relevant: &BTreeSet<String>,
    ) -> LrResult<BuiltLassos> {
        let (stem_edges, loop_edges) = split_path(path)?;
        debug!(
            "path of {} positions: {} stem edges, {} loop edges",
            path.len(),
            stem_edges.len(),
            loop_edges.len()
        );

        let stem = self.path_formulas.formula_for_edges(stem_edges)?;
        let LoopFormula {
            formula: loop_formula,
            entry_ssa,
        } = self.loop_formula(&stem, &loop_edges)?;

        let mut normalizer = FormulaNormalizer::new().with_max_dnf_clauses(self.max_dnf_clauses);
        let stem_clauses = normalizer.normalize(&stem.formula);
        let loop_clauses = normalizer.normalize(&loop_formula.formula);
        debug!(
            "{} stem clauses, {} loop clauses",
            stem_clauses.len(),
            loop_clauses.len()
        );

        let mut built = BuiltLassos::default();
        for stem_clause in &stem_clauses {
            for loop_clause in &loop_clauses {
                self.shutdown.check()?;
                if !self.is_feasible(stem_clause, loop_clause)? {
                    trace!("pruned infeasible pair {stem_clause} ; {loop_clause}");
                    continue;
                }

                let lasso = self
                    .transition(stem_clause, &SsaMap::empty(), &stem.ssa, relevant)
                    .and_then(|stem_transition| {
                        if loop_edges.is_empty() {
                            return Ok(Lasso::without_loop(stem_transition));
                        }
                        let loop_transition = self.transition(
                            loop_clause,
                            &entry_ssa,
                            &loop_formula.ssa,
                            relevant,
                        )?;
                        Ok(Lasso::new(stem_transition, loop_transition))
                    });
                match lasso {
                    Ok(lasso) => built.lassos.push(lasso),
                    Err(LrError::NotLinear(e)) => {
                        warn!("skipping lasso that is not linear: {e}");
                        built.unsupported += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        info!(
            "built {} lassos ({} unsupported)",
            built.lassos.len(),
            built.unsupported
        );
        Ok(built)
    }

    /// Encode the loop edge by edge, recording the entry index of each variable the
    /// first time it shows up.
    fn loop_formula(&self, stem: &PathFormula, edges: &[&M::Edge]) -> LrResult<LoopFormula> {
        let mut formula = self.path_formulas.empty_formula_with_context(stem);
        let mut entry = SsaMapBuilder::new();
        for edge in edges {
            let next = self.path_formulas.make_and(&formula, edge)?;
            for variable in next.formula.variables() {
                if entry.get(variable.name()).is_none() {
                    entry.set(variable.name(), formula.ssa.index_or_default(variable.name()));
                }
            }
            formula = next;
        }
        Ok(LoopFormula {
            formula,
            entry_ssa: entry.build(),
        })
    }

    fn is_feasible(&self, stem_clause: &Formula, loop_clause: &Formula) -> LrResult<bool> {
        let mut prover = self.solver.new_prover()?;
        prover.push(stem_clause.clone() & loop_clause.clone())?;
        Ok(!prover.is_unsat()?)
    }

    fn transition(
        &self,
        clause: &Formula,
        in_ssa: &SsaMap,
        out_ssa: &SsaMap,
        relevant: &BTreeSet<String>,
    ) -> LrResult<LinearTransition> {
        let polyhedron = Polyhedron::from_clause(clause)?;
        let (in_vars, out_vars) = classify_variables(clause, in_ssa, out_ssa);
        Ok(LinearTransition::new(
            vec![polyhedron],
            rank_variables(in_vars, relevant),
            rank_variables(out_vars, relevant),
        ))
    }
}

/// Stem edges and loop edges; the path switches to the loop once and never back.
fn split_path<E>(path: &[PathPosition<E>]) -> LrResult<(Vec<&E>, Vec<&E>)> {
    let mut stem = Vec::new();
    let mut looped = Vec::new();
    let mut in_loop = false;
    for (i, position) in path.iter().enumerate().skip(1) {
        let edge = position.incoming_edge.as_ref().ok_or_else(|| {
            LrError::PathFormula(format!("position {i} of the path has no incoming edge"))
        })?;
        in_loop |= position.in_loop;
        if in_loop {
            looped.push(edge);
        } else {
            stem.push(edge);
        }
    }
    Ok((stem, looped))
}

fn rank_variables(
    instances: BTreeSet<Variable>,
    relevant: &BTreeSet<String>,
) -> BTreeMap<String, Variable> {
    let mut ranked = BTreeMap::new();
    for instance in instances {
        if relevant.contains(instance.name()) {
            ranked.insert(instance.name().to_string(), instance);
        } else if !instance.is_auxiliary() {
            debug!("dropping rank variable {instance}: not relevant for termination");
        }
    }
    ranked
}
