use crate::{
    expr::{Formula, Term, ops::*},
    normalize::simplify,
    variable::FreshNames,
    walker::{Rewriter, rewrite_formula},
};

/// Remove integer division and remainder.
///
/// `a div b` becomes a fresh quotient `q` constrained by
/// `(b > 0 /\ q*b <= a /\ a < (q+1)*b) \/ (b < 0 /\ q*b <= a /\ a < (q-1)*b)`.
/// `a mod b` becomes a fresh remainder `r` with a fresh quotient `q` constrained by
/// `((b > 0 /\ 0 <= r <= b-1) \/ (b < 0 /\ 0 <= r <= -b-1)) /\ a = q*b + r`, so the
/// remainder is never negative. Both axioms are unsatisfiable for `b = 0`.
pub fn eliminate_div_mod(formula: &Formula, fresh: &mut FreshNames) -> Formula {
    let mut pass = DivModElimination {
        fresh,
        axioms: Vec::new(),
    };
    let rewritten = rewrite_formula(formula.clone(), &mut pass);
    if pass.axioms.is_empty() {
        return rewritten;
    }
    Formula::and(std::iter::once(rewritten).chain(pass.axioms))
}

struct DivModElimination<'a> {
    fresh: &'a mut FreshNames,
    axioms: Vec<Formula>,
}

impl DivModElimination<'_> {
    fn push_axiom(&mut self, axiom: Formula) {
        self.axioms.push(simplify(&axiom));
    }
}

impl Rewriter for DivModElimination<'_> {
    fn rewrite_div(&mut self, a: Term, b: Term) -> Term {
        let q = Term::Var(self.fresh.fresh("q"));
        let positive = gt(b.clone(), 0)
            & le(q.clone() * b.clone(), a.clone())
            & lt(a.clone(), (q.clone() + 1) * b.clone());
        let negative = lt(b.clone(), 0)
            & le(q.clone() * b.clone(), a.clone())
            & lt(a, (q.clone() - 1) * b);
        self.push_axiom(positive | negative);
        q
    }

    fn rewrite_mod(&mut self, a: Term, b: Term) -> Term {
        let q = Term::Var(self.fresh.fresh("q"));
        let r = Term::Var(self.fresh.fresh("r"));
        let positive = gt(b.clone(), 0) & le(0, r.clone()) & le(r.clone(), b.clone() - 1);
        let negative = lt(b.clone(), 0) & le(0, r.clone()) & le(r.clone(), -b.clone() - 1);
        let decomposition = eq(a, q * b + r.clone());
        self.push_axiom((positive | negative) & decomposition);
        r
    }
}
