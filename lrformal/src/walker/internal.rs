use crate::expr::{CmpOp, Formula, Term};

/// Pending work of the rewrite loop.
pub(super) enum Task {
    Formula(Formula),
    Term(Term),
    Build(Node),
}

/// Shape of a node whose children have been rewritten and wait on the value stacks.
#[derive(Clone, Copy)]
pub(super) enum Node {
    Add(usize),
    Mul,
    Neg,
    Div,
    Mod,
    TermIte,
    Cmp(CmpOp),
    Not,
    And(usize),
    Or(usize),
    Implies,
    Iff,
    Ite,
}

/// Value stacks: rewritten children are pushed in left-to-right order.
#[derive(Default)]
pub(super) struct Values {
    pub formulas: Vec<Formula>,
    pub terms: Vec<Term>,
}

impl Values {
    pub fn pop_formula(&mut self) -> Formula {
        self.formulas.pop().expect("rewrite stack underflow (formula)")
    }

    pub fn pop_term(&mut self) -> Term {
        self.terms.pop().expect("rewrite stack underflow (term)")
    }

    pub fn pop_formulas(&mut self, n: usize) -> Vec<Formula> {
        let at = self.formulas.len() - n;
        self.formulas.split_off(at)
    }

    pub fn pop_terms(&mut self, n: usize) -> Vec<Term> {
        let at = self.terms.len() - n;
        self.terms.split_off(at)
    }
}

/// Schedule `term`: leaves are rewritten immediately, inner nodes push their build step
/// followed by their children in reverse so the first child is handled first.
pub(super) fn schedule_term(term: Term, tasks: &mut Vec<Task>) -> Option<Term> {
    match term {
        leaf @ (Term::Var(_) | Term::Const(_)) => Some(leaf),
        Term::Add(args) => {
            tasks.push(Task::Build(Node::Add(args.len())));
            tasks.extend(args.into_iter().rev().map(Task::Term));
            None
        }
        Term::Mul(lhs, rhs) => binary_term(Node::Mul, *lhs, *rhs, tasks),
        Term::Div(lhs, rhs) => binary_term(Node::Div, *lhs, *rhs, tasks),
        Term::Mod(lhs, rhs) => binary_term(Node::Mod, *lhs, *rhs, tasks),
        Term::Neg(inner) => {
            tasks.push(Task::Build(Node::Neg));
            tasks.push(Task::Term(*inner));
            None
        }
        Term::Ite(condition, then_branch, else_branch) => {
            tasks.push(Task::Build(Node::TermIte));
            tasks.push(Task::Term(*else_branch));
            tasks.push(Task::Term(*then_branch));
            tasks.push(Task::Formula(*condition));
            None
        }
    }
}

fn binary_term(node: Node, lhs: Term, rhs: Term, tasks: &mut Vec<Task>) -> Option<Term> {
    tasks.push(Task::Build(node));
    tasks.push(Task::Term(rhs));
    tasks.push(Task::Term(lhs));
    None
}

/// Formula counterpart of [`schedule_term`].
pub(super) fn schedule_formula(formula: Formula, tasks: &mut Vec<Task>) -> Option<Formula> {
    match formula {
        leaf @ (Formula::True | Formula::False) => Some(leaf),
        Formula::Cmp(op, lhs, rhs) => {
            tasks.push(Task::Build(Node::Cmp(op)));
            tasks.push(Task::Term(rhs));
            tasks.push(Task::Term(lhs));
            None
        }
        Formula::Not(inner) => {
            tasks.push(Task::Build(Node::Not));
            tasks.push(Task::Formula(*inner));
            None
        }
        Formula::And(args) => {
            tasks.push(Task::Build(Node::And(args.len())));
            tasks.extend(args.into_iter().rev().map(Task::Formula));
            None
        }
        Formula::Or(args) => {
            tasks.push(Task::Build(Node::Or(args.len())));
            tasks.extend(args.into_iter().rev().map(Task::Formula));
            None
        }
        Formula::Implies(lhs, rhs) => binary_formula(Node::Implies, *lhs, *rhs, tasks),
        Formula::Iff(lhs, rhs) => binary_formula(Node::Iff, *lhs, *rhs, tasks),
        Formula::Ite(condition, then_branch, else_branch) => {
            tasks.push(Task::Build(Node::Ite));
            tasks.push(Task::Formula(*else_branch));
            tasks.push(Task::Formula(*then_branch));
            tasks.push(Task::Formula(*condition));
            None
        }
    }
}

fn binary_formula(node: Node, lhs: Formula, rhs: Formula, tasks: &mut Vec<Task>) -> Option<Formula> {
    tasks.push(Task::Build(node));
    tasks.push(Task::Formula(rhs));
    tasks.push(Task::Formula(lhs));
    None
}
