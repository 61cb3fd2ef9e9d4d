use crate::{
    expr::{Formula, Term, ops::eq},
    variable::FreshNames,
    walker::{Rewriter, rewrite_formula},
};

/// Remove every if-then-else.
///
/// A term `if c then t else e` is replaced by a fresh variable `v` and the definition
/// `(c /\ v = t) \/ (!c /\ v = e)` is conjoined at the top level. A formula-level
/// if-then-else becomes `(c /\ t) \/ (!c /\ e)`.
pub fn eliminate_ite(formula: &Formula, fresh: &mut FreshNames) -> Formula {
    let mut pass = IteElimination {
        fresh,
        definitions: Vec::new(),
    };
    let rewritten = rewrite_formula(formula.clone(), &mut pass);
    if pass.definitions.is_empty() {
        return rewritten;
    }
    Formula::and(std::iter::once(rewritten).chain(pass.definitions))
}

struct IteElimination<'a> {
    fresh: &'a mut FreshNames,
    definitions: Vec<Formula>,
}

impl Rewriter for IteElimination<'_> {
    fn rewrite_term_ite(&mut self, condition: Formula, then_branch: Term, else_branch: Term) -> Term {
        let value = Term::Var(self.fresh.fresh("ite"));
        let definition = (condition.clone() & eq(value.clone(), then_branch))
            | (!condition & eq(value.clone(), else_branch));
        self.definitions.push(definition);
        value
    }

    fn rewrite_ite(&mut self, condition: Formula, then_branch: Formula, else_branch: Formula) -> Formula {
        (condition.clone() & then_branch) | (!condition & else_branch)
    }
}
