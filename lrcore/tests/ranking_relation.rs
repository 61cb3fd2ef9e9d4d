use lrcore::{
    provers::{FourierMotzkinSolver, Solver},
    ranking::RankingRelation,
};
use lrformal::prelude::*;
use num_bigint::BigInt;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const NAMES: [&str; 3] = ["x", "y", "z"];

fn pre_or_post(rng: &mut impl Rng) -> Term {
    let name = NAMES[rng.random_range(0..NAMES.len())];
    if rng.random_bool(0.5) {
        Term::var(name)
    } else {
        Term::Var(Variable::primed(name))
    }
}

/// `t >= t' + 1 /\ t >= b` over a random pre/post pair.
fn condition(rng: &mut impl Rng) -> Formula {
    let name = NAMES[rng.random_range(0..NAMES.len())];
    let pre = Term::var(name);
    let post = Term::Var(Variable::primed(name));
    ge(pre.clone(), post + 1) & ge(pre, rng.random_range(-2..=2))
}

fn relation(rng: &mut impl Rng) -> RankingRelation {
    let count = rng.random_range(1..=3);
    let conditions: Vec<Formula> = (0..count).map(|_| condition(rng)).collect();
    let invariants: Vec<Formula> = (0..rng.random_range(0..=2))
        .map(|_| ge(pre_or_post(rng), rng.random_range(-1..=1)))
        .collect();
    RankingRelation::from_conditions(conditions)
        .unwrap()
        .with_supporting_invariants(invariants)
}

fn model(rng: &mut impl Rng) -> Model {
    NAMES
        .iter()
        .flat_map(|name| [Variable::new(*name), Variable::primed(name)])
        .map(|variable| (variable, BigInt::from(rng.random_range(-4..=4))))
        .collect()
}

#[test]
fn merge_is_a_commutative_union() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    for _ in 0..200 {
        let (a, b, c) = (relation(&mut rng), relation(&mut rng), relation(&mut rng));
        assert_eq!(a.merge(&b), b.merge(&a));
        assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
        assert_eq!(a.merge(&a), a);
        assert!(a.conditions().is_subset(b.merge(&a).conditions()));
        assert!(
            a.supporting_invariants()
                .is_subset(a.merge(&b).supporting_invariants())
        );
    }
}

#[test]
fn merged_formula_is_the_disjunction() {
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    for _ in 0..100 {
        let (a, b) = (relation(&mut rng), relation(&mut rng));
        let merged = a.merge(&b).as_formula();
        let expected = a.as_formula() | b.as_formula();
        for _ in 0..20 {
            let m = model(&mut rng);
            assert_eq!(merged.eval(&m), expected.eval(&m), "{merged} vs {expected}");
        }
    }
}

#[test]
fn supporting_invariants_accumulate() {
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    for _ in 0..50 {
        let a = relation(&mut rng);
        let invariants: Vec<Formula> = a.supporting_invariants().iter().cloned().collect();
        assert_eq!(a.with_supporting_invariants(invariants), a);

        let extra = ge(Term::var("x"), 0);
        let extended = a.with_supporting_invariants([extra.clone()]);
        assert!(extended.supporting_invariants().contains(&extra));
        assert_eq!(extended.conditions(), a.conditions());
        assert_eq!(extended.as_formula(), a.as_formula());
    }
}

#[test]
fn formula_survives_import_into_the_embedded_solver() {
    let solver = FourierMotzkinSolver::new();
    let relation = RankingRelation::new(ge(Term::var("x"), Term::Var(Variable::primed("x")) + 1));
    let imported = relation.as_formula_from_other_solver(&solver);
    assert_eq!(imported, relation.as_formula());

    // the relation holds on a decreasing step and not on an increasing one
    let mut prover = solver.new_prover().unwrap();
    prover.push(imported.clone()).unwrap();
    prover
        .push(eq(Term::Var(Variable::primed("x")), Term::var("x") + 1))
        .unwrap();
    assert!(prover.is_unsat().unwrap());
    prover.pop().unwrap();
    prover
        .push(eq(Term::Var(Variable::primed("x")), Term::var("x") - 3))
        .unwrap();
    assert!(!prover.is_unsat().unwrap());
}
