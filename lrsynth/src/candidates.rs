use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use log::{debug, trace};
use lrcore::{
    lasso::Lasso,
    provers::Solver,
    synthesis::{
        NonTerminationSettings, NonTerminationSynthesizer, Preferences, SynthesisBackend,
        TerminationSettings, TerminationSynthesizer,
    },
    utils::error::{LrError, LrResult},
};
use lrformal::prelude::Variable;

use crate::{nontermination::RecurrentSetGuesser, termination::TemplateGuesser};

/// Upper bound on the ranking functions checked per synthesis call.
pub const DEFAULT_MAX_CANDIDATES: usize = 256;

/// Backward strengthening steps applied to a recurrent set candidate.
pub const DEFAULT_REFINEMENTS: usize = 3;

/// Synthesis calls served so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStatistics {
    pub termination_requests: usize,
    pub non_termination_requests: usize,
}

/// [`SynthesisBackend`] that checks candidates derived from the lasso with the embedded
/// prover. External solvers are not supported.
///
/// Non-termination is only ever argued with a recurrent set; geometric arguments are
/// never produced and [`NonTerminationSettings::eigenvectors`] is ignored.
#[derive(Debug)]
pub struct GuessingBackend {
    max_candidates: usize,
    refinements: usize,
    termination_requests: AtomicUsize,
    non_termination_requests: AtomicUsize,
}

impl Default for GuessingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GuessingBackend {
    pub fn new() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            refinements: DEFAULT_REFINEMENTS,
            termination_requests: AtomicUsize::new(0),
            non_termination_requests: AtomicUsize::new(0),
        }
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn with_refinements(mut self, refinements: usize) -> Self {
        self.refinements = refinements;
        self
    }

    pub fn statistics(&self) -> BackendStatistics {
        BackendStatistics {
            termination_requests: self.termination_requests.load(Ordering::Relaxed),
            non_termination_requests: self.non_termination_requests.load(Ordering::Relaxed),
        }
    }

    fn check_preferences(preferences: &Preferences) -> LrResult<()> {
        if preferences.external_solver {
            return Err(LrError::Synthesis(format!(
                "external solver `{}` is not available to the guessing backend",
                preferences.external_solver_command
            )));
        }
        Ok(())
    }
}

impl SynthesisBackend for GuessingBackend {
    fn termination_synthesizer<'a>(
        &'a self,
        lasso: &'a Lasso,
        solver: &'a dyn Solver,
        preferences: &Preferences,
        settings: &TerminationSettings,
    ) -> LrResult<Box<dyn TerminationSynthesizer + 'a>> {
        self.termination_requests.fetch_add(1, Ordering::Relaxed);
        Self::check_preferences(preferences)?;
        trace!("termination synthesizer for the {} template", settings.template);
        Ok(Box::new(TemplateGuesser::new(
            lasso,
            solver,
            settings,
            preferences.analysis_type.wants_guesses(),
            self.max_candidates,
        )))
    }

    fn non_termination_synthesizer<'a>(
        &'a self,
        lasso: &'a Lasso,
        solver: &'a dyn Solver,
        preferences: &Preferences,
        settings: &NonTerminationSettings,
    ) -> LrResult<Box<dyn NonTerminationSynthesizer + 'a>> {
        self.non_termination_requests.fetch_add(1, Ordering::Relaxed);
        Self::check_preferences(preferences)?;
        trace!(
            "non-termination synthesizer ({} eigenvectors requested, recurrent sets only)",
            settings.eigenvectors
        );
        Ok(Box::new(RecurrentSetGuesser::new(
            lasso,
            solver,
            self.refinements,
        )))
    }

    fn close(&self) {
        let statistics = self.statistics();
        debug!(
            "guessing backend closed after {} termination and {} non-termination requests",
            statistics.termination_requests, statistics.non_termination_requests
        );
    }
}

/// Maps every instance of `state` back to the bare program variable it belongs to.
pub(crate) fn instance_names(state: &BTreeMap<String, Variable>) -> BTreeMap<Variable, Variable> {
    state
        .iter()
        .map(|(name, instance)| (instance.clone(), Variable::new(name.as_str())))
        .collect()
}

pub(crate) fn interruption() -> LrError {
    LrError::Interrupted("solver interrupted during synthesis".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrcore::{
        config::{AnalysisType, SolverProfile, TerminationConfig},
        lasso::LinearTransition,
        provers::FourierMotzkinSolver,
        synthesis::RankingTemplate,
    };

    #[test]
    fn instances_map_back_to_names() {
        let state = BTreeMap::from([
            ("x".to_string(), Variable::indexed("x", 3)),
            ("n".to_string(), Variable::indexed("n", 1)),
        ]);
        let names = instance_names(&state);
        assert_eq!(names.get(&Variable::indexed("x", 3)), Some(&Variable::new("x")));
        assert_eq!(names.get(&Variable::indexed("n", 1)), Some(&Variable::new("n")));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn external_solvers_are_refused_and_counted() {
        let backend = GuessingBackend::new();
        let solver = FourierMotzkinSolver::new();
        let lasso = Lasso::new(LinearTransition::trivial(), LinearTransition::trivial());
        let config = TerminationConfig::default();
        let profile = SolverProfile {
            analysis_type: AnalysisType::Linear,
            external_solver: true,
        };
        let preferences = Preferences::from_profile(&profile, &config);

        let result = backend.termination_synthesizer(
            &lasso,
            &solver,
            &preferences,
            &TerminationSettings::new(RankingTemplate::Affine, &config),
        );
        assert!(matches!(result, Err(LrError::Synthesis(_))));
        assert_eq!(
            backend.statistics(),
            BackendStatistics {
                termination_requests: 1,
                non_termination_requests: 0,
            }
        );
    }
}
