use lrformal::expr::euclid_div_rem;
use lrformal::normalize::eliminate_div_mod;
use lrformal::prelude::*;
use num_bigint::BigInt;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// `r = a mod b` with the quotient and remainder variables introduced by the elimination.
fn mod_axiom() -> (Formula, Variable, Variable) {
    let f = eq(Term::var("r"), Term::var("a").modulo(Term::var("b")));
    let mut fresh = FreshNames::new();
    let g = eliminate_div_mod(&f, &mut fresh);
    let aux: Vec<Variable> = g.variables().into_iter().filter(Variable::is_auxiliary).collect();
    let q = aux.iter().find(|v| v.name().starts_with("__q")).cloned().unwrap();
    let r = aux.iter().find(|v| v.name().starts_with("__r")).cloned().unwrap();
    (g, q, r)
}

fn model(a: i64, b: i64, r: i64, q: (&Variable, i64), rem: (&Variable, i64)) -> Model {
    Model::from([
        (Variable::new("a"), BigInt::from(a)),
        (Variable::new("b"), BigInt::from(b)),
        (Variable::new("r"), BigInt::from(r)),
        (q.0.clone(), BigInt::from(q.1)),
        (rem.0.clone(), BigInt::from(rem.1)),
    ])
}

/// Remainders admitted by the axiom for `a mod b`, searching quotients in a window.
fn admitted_remainders(a: i64, b: i64) -> Vec<i64> {
    let (g, q, r) = mod_axiom();
    let window = a.abs() + 2;
    let mut found = Vec::new();
    for rem in -b.abs() - 2..=b.abs() + 2 {
        let admitted = (-window..=window)
            .any(|quot| g.eval(&model(a, b, rem, (&q, quot), (&r, rem))) == Some(true));
        if admitted {
            found.push(rem);
        }
    }
    found
}

#[test]
fn remainder_matches_smt_convention() {
    assert_eq!(admitted_remainders(7, 3), vec![1]);
    assert_eq!(admitted_remainders(-7, 3), vec![2]);
    let negative_divisor = admitted_remainders(7, -3);
    assert_eq!(negative_divisor.len(), 1);
    assert!((0..=2).contains(&negative_divisor[0]));
}

#[test]
fn axiom_agrees_with_euclidean_division() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);
    for _ in 0..60 {
        let a = rng.random_range(-20..=20i64);
        let b = loop {
            let b = rng.random_range(-6..=6i64);
            if b != 0 {
                break b;
            }
        };
        let (q, r) = euclid_div_rem(&BigInt::from(a), &BigInt::from(b)).unwrap();
        let (q, r) = (i64::try_from(q).unwrap(), i64::try_from(r).unwrap());
        assert_eq!(a, q * b + r);
        assert!(0 <= r && r < b.abs());
        assert_eq!(admitted_remainders(a, b), vec![r], "a = {a}, b = {b}");
    }
}

#[test]
fn division_quotient_is_unique() {
    let f = eq(Term::var("d"), Term::var("a").div(Term::var("b")));
    let mut fresh = FreshNames::new();
    let g = eliminate_div_mod(&f, &mut fresh);
    let q = g
        .variables()
        .into_iter()
        .find(Variable::is_auxiliary)
        .unwrap();

    for (a, b) in [(7, 3), (-7, 3), (7, -3), (-7, -3), (0, 5)] {
        let (expected, _) = euclid_div_rem(&BigInt::from(a), &BigInt::from(b)).unwrap();
        let admitted: Vec<i64> = (-10..=10)
            .filter(|quot| {
                let model = Model::from([
                    (Variable::new("a"), BigInt::from(a)),
                    (Variable::new("b"), BigInt::from(b)),
                    (Variable::new("d"), BigInt::from(*quot)),
                    (q.clone(), BigInt::from(*quot)),
                ]);
                g.eval(&model) == Some(true)
            })
            .collect();
        assert_eq!(admitted, vec![i64::try_from(expected).unwrap()], "a = {a}, b = {b}");
    }
}

#[test]
fn division_by_constant_zero_is_unsatisfiable() {
    let f = eq(Term::var("d"), Term::var("a").div(0));
    let clauses = FormulaNormalizer::new().normalize(&f);
    for clause in clauses {
        assert!(clause.conjuncts().any(Formula::is_false), "{clause}");
    }
}
