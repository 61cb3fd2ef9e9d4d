//! Termination analysis of one loop from its lassos.
//!
//! [`LassoAnalysis`] runs in two phases over the lassos of a loop:
//!
//! 1. Non-termination: every lasso is handed to a non-termination synthesizer. The
//!    first witness decides the loop; nothing else is attempted.
//! 2. Termination: for every lasso, ranking templates are tried from the affine one up
//!    to the configured nesting depth. A synthesized argument is turned into a
//!    [`RankingRelation`] and accepted only after the prover confirms it on the loop.
//!    The loop terminates when every lasso got a confirmed relation; the result is the
//!    merge of those relations.
//!
//! Anything short of that is [`Verdict::Unknown`]. Synthesizers and prover sessions
//! live for one attempt; the solver and the backend live as long as the analysis and
//! are released by [`LassoAnalysis::close`].

pub mod result;

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use log::{debug, info, trace, warn};
use lrformal::{
    prelude::Formula,
    variable::{AUX_PREFIX, INDEX_SEPARATOR, PRIME_SUFFIX},
};

use crate::{
    cfa::{PathFormulaManager, PathPosition},
    config::TerminationConfig,
    lasso::{Lasso, LassoBuilder},
    magic::{NOT_YET_IMPLEMENTED, SYNTHESIS_DUMP_PREFIX},
    provers::Solver,
    ranking::{RankingRelation, RankingRelationBuilder},
    synthesis::{
        NonTerminationArgument, NonTerminationSettings, Preferences, RankingTemplate,
        SynthesisBackend, TerminationArgument, TerminationSettings,
    },
    utils::{
        error::{LrError, LrResult},
        shutdown::ShutdownNotifier,
    },
};

pub use result::Verdict;

/// Outcome of the template search on one lasso.
enum TemplateSearch {
    Proven(RankingRelation),
    Failed,
    /// A relation could not be built; the loop is given up.
    Abandoned,
}

pub struct LassoAnalysis<B: SynthesisBackend> {
    solver: Arc<dyn Solver>,
    backend: B,
    config: TerminationConfig,
    shutdown: ShutdownNotifier,
    relation_builder: RankingRelationBuilder,
    dumped: AtomicUsize,
    closed: bool,
}

impl<B: SynthesisBackend> LassoAnalysis<B> {
    /// A shutdown request on `shutdown` also interrupts `solver`.
    ///
    /// `config.max_dnf_clauses` bounds the lasso builder only; a solver that normalizes
    /// on its own is configured separately (see `FourierMotzkinSolver::from_config`).
    pub fn new(
        solver: Arc<dyn Solver>,
        backend: B,
        config: TerminationConfig,
        shutdown: ShutdownNotifier,
    ) -> LrResult<Self> {
        config.validate()?;

        let weak = Arc::downgrade(&solver);
        shutdown.register(move |reason| {
            if let Some(solver) = weak.upgrade() {
                debug!("interrupting solver: {reason}");
                solver.interrupt();
            }
        });

        Ok(Self {
            solver,
            backend,
            config,
            shutdown,
            relation_builder: RankingRelationBuilder::new(),
            dumped: AtomicUsize::new(0),
            closed: false,
        })
    }

    pub fn config(&self) -> &TerminationConfig {
        &self.config
    }

    pub fn solver(&self) -> &dyn Solver {
        self.solver.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Build the lassos of `path` and analyze them.
    ///
    /// A path that cannot be turned into lassos yields [`Verdict::Unknown`].
    pub fn check_termination_of_path<M: PathFormulaManager>(
        &self,
        label: &str,
        path: &[PathPosition<M::Edge>],
        path_formulas: &M,
        relevant: &BTreeSet<String>,
    ) -> LrResult<Verdict> {
        validate_relevant(relevant)?;
        self.shutdown.check()?;

        let builder = LassoBuilder::new(self.solver.as_ref(), path_formulas, &self.shutdown)
            .with_max_dnf_clauses(self.config.max_dnf_clauses);
        let built = match builder.build_lassos(path, relevant) {
            Ok(built) => built,
            Err(e) if e.is_interrupted() => return Err(e),
            Err(e) => {
                warn!("cannot build lassos for loop {label}: {e}");
                return Ok(Verdict::Unknown);
            }
        };
        info!(
            "loop {label}: {} lasso(s) from a path of {} positions",
            built.lassos.len(),
            path.len()
        );
        self.analyze(label, &built.lassos, built.unsupported, relevant)
    }

    /// Analyze lassos that were built elsewhere.
    pub fn check_termination(
        &self,
        label: &str,
        lassos: &[Lasso],
        relevant: &BTreeSet<String>,
    ) -> LrResult<Verdict> {
        validate_relevant(relevant)?;
        self.analyze(label, lassos, 0, relevant)
    }

    /// Release the solver and the backend.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.backend.close();
        self.solver.close();
        debug!("termination analysis closed");
    }

    fn analyze(
        &self,
        label: &str,
        lassos: &[Lasso],
        unsupported: usize,
        relevant: &BTreeSet<String>,
    ) -> LrResult<Verdict> {
        for (index, lasso) in lassos.iter().enumerate() {
            self.shutdown.check()?;
            if lasso.is_degenerate() {
                continue;
            }
            if let Some(argument) = self.synthesize_non_termination(label, index, lasso)? {
                info!("loop {label} does not terminate: {argument}");
                return Ok(Verdict::NonTerminating(argument));
            }
        }

        if unsupported > 0 {
            info!("loop {label}: {unsupported} lasso(s) are not linear");
            return Ok(Verdict::Unknown);
        }
        if lassos.is_empty() {
            debug!("loop {label}: no feasible lasso");
            return Ok(Verdict::Unknown);
        }

        let mut proven: Option<RankingRelation> = None;
        for (index, lasso) in lassos.iter().enumerate() {
            self.shutdown.check()?;
            if lasso.is_degenerate() {
                info!("loop {label}: lasso {index} has no loop edges");
                return Ok(Verdict::Unknown);
            }
            match self.search_templates(label, index, lasso, relevant)? {
                TemplateSearch::Proven(relation) => {
                    proven = Some(match proven {
                        Some(previous) => previous.merge(&relation),
                        None => relation,
                    });
                }
                TemplateSearch::Failed => {
                    info!("loop {label}: no ranking function for lasso {index}");
                    return Ok(Verdict::Unknown);
                }
                TemplateSearch::Abandoned => return Ok(Verdict::Unknown),
            }
        }

        let verdict = proven.map_or(Verdict::Unknown, Verdict::Terminating);
        info!("loop {label}: {verdict}");
        Ok(verdict)
    }

    fn synthesize_non_termination(
        &self,
        label: &str,
        index: usize,
        lasso: &Lasso,
    ) -> LrResult<Option<NonTerminationArgument>> {
        let profile = &self.config.nonlinear;
        if profile.analysis_type.is_disabled() {
            return Ok(None);
        }
        self.shutdown.check()?;
        self.dump(label, index, lasso)?;

        let preferences = Preferences::from_profile(profile, &self.config);
        let settings = NonTerminationSettings::new(&self.config);
        match self.run_non_termination(lasso, &preferences, &settings) {
            Ok(argument) => Ok(argument),
            Err(e) => {
                self.recover(e)?;
                Ok(None)
            }
        }
    }

    fn run_non_termination(
        &self,
        lasso: &Lasso,
        preferences: &Preferences,
        settings: &NonTerminationSettings,
    ) -> LrResult<Option<NonTerminationArgument>> {
        let mut synthesizer = self.backend.non_termination_synthesizer(
            lasso,
            self.solver.as_ref(),
            preferences,
            settings,
        )?;
        let result = synthesizer.synthesize()?;
        trace!("non-termination synthesis: {result:?}");
        Ok(if synthesizer.synthesis_successful() {
            synthesizer.argument().cloned()
        } else {
            None
        })
    }

    fn search_templates(
        &self,
        label: &str,
        index: usize,
        lasso: &Lasso,
        relevant: &BTreeSet<String>,
    ) -> LrResult<TemplateSearch> {
        for template in RankingTemplate::templates_up_to(self.config.max_template_functions) {
            let profile = if template.is_nonlinear() {
                &self.config.nonlinear
            } else {
                &self.config.linear
            };
            if profile.analysis_type.is_disabled() {
                continue;
            }
            self.shutdown.check()?;
            self.dump(label, index, lasso)?;

            let preferences = Preferences::from_profile(profile, &self.config);
            let settings = TerminationSettings::new(template, &self.config);
            let argument = match self.run_termination(lasso, &preferences, &settings) {
                Ok(argument) => argument,
                Err(e) => {
                    self.recover(e)?;
                    return Ok(TemplateSearch::Failed);
                }
            };
            let Some(argument) = argument else {
                debug!("lasso {index}: no {template} ranking function");
                continue;
            };

            let relation = match self
                .relation_builder
                .from_termination_argument(&argument, relevant)
            {
                Ok(relation) => relation,
                Err(e) => {
                    warn!("loop {label}: giving up termination analysis: {e}");
                    return Ok(TemplateSearch::Abandoned);
                }
            };

            match self.confirm(lasso, &relation) {
                Ok(true) => {
                    debug!("lasso {index}: {template} ranking function {argument}");
                    return Ok(TemplateSearch::Proven(relation));
                }
                Ok(false) => warn!("lasso {index}: rejecting unconfirmed relation {relation}"),
                Err(e) if e.is_interrupted() => return Err(e),
                Err(e) => {
                    warn!("lasso {index}: cannot confirm relation: {e}");
                    return Ok(TemplateSearch::Failed);
                }
            }
        }
        Ok(TemplateSearch::Failed)
    }

    fn run_termination(
        &self,
        lasso: &Lasso,
        preferences: &Preferences,
        settings: &TerminationSettings,
    ) -> LrResult<Option<TerminationArgument>> {
        let mut synthesizer = self.backend.termination_synthesizer(
            lasso,
            self.solver.as_ref(),
            preferences,
            settings,
        )?;
        let result = synthesizer.synthesize()?;
        trace!("{} synthesis: {result:?}", settings.template);
        Ok(if synthesizer.synthesis_successful() {
            synthesizer.argument().cloned()
        } else {
            None
        })
    }

    /// Every loop step from an invariant state satisfies the relation, the invariants
    /// hold when the stem ends and the loop preserves them.
    fn confirm(&self, lasso: &Lasso, relation: &RankingRelation) -> LrResult<bool> {
        let looped = &lasso.loop_transition;
        let transition = looped.to_formula();
        let (decrease, invariants) = relation.instantiate(&looped.in_vars, &looped.out_vars);
        if !self.is_unsat([transition.clone(), invariants.clone(), !decrease])? {
            return Ok(false);
        }
        if relation.supporting_invariants().is_empty() {
            return Ok(true);
        }

        let (_, at_entry) = relation.instantiate(&lasso.stem.out_vars, &BTreeMap::new());
        if !self.is_unsat([lasso.stem.to_formula(), !at_entry])? {
            return Ok(false);
        }
        let (_, after_step) = relation.instantiate(&looped.out_vars, &BTreeMap::new());
        self.is_unsat([transition, invariants, !after_step])
    }

    fn is_unsat(&self, formulas: impl IntoIterator<Item = Formula>) -> LrResult<bool> {
        self.shutdown.check()?;
        let mut prover = self.solver.new_prover()?;
        for formula in formulas {
            prover.push(formula)?;
        }
        prover.is_unsat()
    }

    /// Interruptions propagate; other synthesis failures only end the attempt.
    fn recover(&self, error: LrError) -> LrResult<()> {
        match error {
            LrError::Interrupted(_) => Err(error),
            LrError::SynthesisAssertion(ref message)
                if message.contains(NOT_YET_IMPLEMENTED) && self.shutdown.should_shutdown() =>
            {
                Err(self.shutdown.interruption())
            }
            other => {
                warn!("synthesis failed: {other}");
                Ok(())
            }
        }
    }

    fn dump(&self, label: &str, index: usize, lasso: &Lasso) -> LrResult<()> {
        let Some(directory) = &self.config.dump_synthesis_queries else {
            return Ok(());
        };
        std::fs::create_dir_all(directory)?;
        let sequence = self.dumped.fetch_add(1, Ordering::Relaxed);
        let label: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let path = directory.join(format!(
            "{SYNTHESIS_DUMP_PREFIX}-{label}-{index}-{sequence}.txt"
        ));
        std::fs::write(&path, lasso.to_string())?;
        trace!("dumped lasso {index} to {}", path.display());
        Ok(())
    }
}

impl<B: SynthesisBackend> Drop for LassoAnalysis<B> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("termination analysis dropped without close()");
            self.release();
        }
    }
}

fn validate_relevant(relevant: &BTreeSet<String>) -> LrResult<()> {
    for name in relevant {
        if name.is_empty()
            || name.starts_with(AUX_PREFIX)
            || name.contains(INDEX_SEPARATOR)
            || name.ends_with(PRIME_SUFFIX)
        {
            return Err(LrError::InvalidArgument(format!(
                "`{name}` cannot be a variable relevant for termination"
            )));
        }
    }
    Ok(())
}
