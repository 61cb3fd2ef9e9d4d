use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use lrcore::{
    cfa::{
        PathPosition,
        encoder::{Edge, SsaEncoder},
    },
    config::{AnalysisType, TerminationConfig},
    provers::FourierMotzkinSolver,
    synthesis::NonTerminationArgument,
    termination::{LassoAnalysis, Verdict},
    utils::shutdown::ShutdownNotifier,
};
use lrformal::prelude::*;
use lrsynth::{BackendStatistics, GuessingBackend};
use num_bigint::BigInt;

fn x() -> Term {
    Term::var("x")
}

fn y() -> Term {
    Term::var("y")
}

fn relevant(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn lasso_path(stem: Vec<Edge>, looped: Vec<Edge>) -> Vec<PathPosition<Edge>> {
    std::iter::once(PathPosition::initial())
        .chain(stem.into_iter().map(PathPosition::stem))
        .chain(looped.into_iter().map(PathPosition::looping))
        .collect()
}

fn analysis(config: TerminationConfig) -> LassoAnalysis<GuessingBackend> {
    LassoAnalysis::new(
        Arc::new(FourierMotzkinSolver::from_config(&config)),
        GuessingBackend::new(),
        config,
        ShutdownNotifier::new(),
    )
    .unwrap()
}

fn run(
    analysis: &LassoAnalysis<GuessingBackend>,
    path: &[PathPosition<Edge>],
    names: &[&str],
) -> Verdict {
    analysis
        .check_termination_of_path("loop", path, &SsaEncoder::new(), &relevant(names))
        .unwrap()
}

#[test]
fn countdown_terminates() {
    let analysis = analysis(TerminationConfig::default());
    let path = lasso_path(
        vec![Edge::assign("x", 5)],
        vec![Edge::assume(gt(x(), 0)), Edge::assign("x", x() - 1)],
    );

    let verdict = run(&analysis, &path, &["x"]);
    let relation = verdict.try_as_terminating().unwrap();
    assert_eq!(relation.to_string(), "x >= x' + 1 /\\ x >= 1");
    assert_eq!(
        analysis.backend().statistics(),
        BackendStatistics {
            termination_requests: 1,
            non_termination_requests: 1,
        }
    );
    analysis.close();
}

#[test]
fn counting_up_does_not_terminate() {
    let analysis = analysis(TerminationConfig::default());
    let path = lasso_path(
        vec![Edge::assign("x", 1)],
        vec![Edge::assume(gt(x(), 0)), Edge::assign("x", x() + 1)],
    );

    let verdict = run(&analysis, &path, &["x"]);
    let Verdict::NonTerminating(NonTerminationArgument::RecurrentSet { initial, set }) = &verdict
    else {
        panic!("expected a recurrent set, got {verdict}");
    };
    assert_eq!(initial, &BTreeMap::from([("x".to_string(), BigInt::from(1))]));
    let at = |value: i64| Model::from([(Variable::new("x"), BigInt::from(value))]);
    assert_eq!(set.eval(&at(3)), Some(true));
    assert_eq!(set.eval(&at(0)), Some(false));
    // the witness short-circuits the ranking function search
    assert_eq!(analysis.backend().statistics().termination_requests, 0);
    analysis.close();
}

#[test]
fn unguarded_increment_does_not_terminate() {
    let analysis = analysis(TerminationConfig::default());
    let path = lasso_path(
        vec![Edge::havoc("x")],
        vec![Edge::assign("x", x() + 1)],
    );

    let verdict = run(&analysis, &path, &["x"]);
    let argument = verdict.try_as_non_terminating().unwrap();
    assert!(argument.is_recurrent_set());
    assert!(argument.initial_state().contains_key("x"));
    analysis.close();
}

#[test]
fn stem_only_paths_are_unknown() {
    let analysis = analysis(TerminationConfig::default());
    let path = lasso_path(vec![Edge::assign("x", 1), Edge::Skip], vec![]);

    assert_eq!(run(&analysis, &path, &["x"]), Verdict::Unknown);
    assert_eq!(analysis.backend().statistics(), BackendStatistics::default());
    analysis.close();
}

#[test]
fn an_idle_loop_does_not_terminate() {
    let analysis = analysis(TerminationConfig::default());
    let path = lasso_path(vec![Edge::assign("x", 1)], vec![Edge::Skip]);

    let verdict = run(&analysis, &path, &["x"]);
    let argument = verdict.try_as_non_terminating().unwrap();
    assert!(argument.is_recurrent_set());
    assert_eq!(
        analysis.backend().statistics(),
        BackendStatistics {
            termination_requests: 0,
            non_termination_requests: 1,
        }
    );
    analysis.close();
}

#[test]
fn stem_invariants_support_the_ranking_function() {
    let analysis = analysis(TerminationConfig::default());
    let path = lasso_path(
        vec![Edge::assign("y", 1)],
        vec![Edge::assume(gt(x(), 0)), Edge::assign("x", x() - y())],
    );

    let verdict = run(&analysis, &path, &["x", "y"]);
    let relation = verdict.try_as_terminating().unwrap();
    assert_eq!(relation.as_formula().to_string(), "x >= x' + 1 /\\ x >= 1");
    assert_eq!(relation.supporting_invariants().len(), 2);
    analysis.close();
}

#[test]
fn invariants_are_not_guessed_without_guessing_profiles() {
    let mut config = TerminationConfig::default();
    config.linear.analysis_type = AnalysisType::Linear;
    config.nonlinear.analysis_type = AnalysisType::Linear;
    let analysis = analysis(config);
    let path = lasso_path(
        vec![Edge::assign("y", 1)],
        vec![Edge::assume(gt(x(), 0)), Edge::assign("x", x() - y())],
    );

    assert_eq!(run(&analysis, &path, &["x", "y"]), Verdict::Unknown);
    analysis.close();
}

#[test]
fn a_stuck_branch_does_not_terminate() {
    let analysis = analysis(TerminationConfig::default());
    // x only decreases while y is positive
    let path = lasso_path(
        vec![Edge::havoc("x"), Edge::havoc("y")],
        vec![
            Edge::assume(gt(x(), 0)),
            Edge::assign("x", Term::ite(gt(y(), 0), x() - 1, x())),
        ],
    );

    let verdict = run(&analysis, &path, &["x", "y"]);
    let argument = verdict.try_as_non_terminating().unwrap();
    let initial = argument.initial_state();
    assert!(initial["x"] >= BigInt::from(1));
    assert!(initial["y"] <= BigInt::from(0));
    assert_eq!(analysis.backend().statistics().termination_requests, 0);
    analysis.close();
}
