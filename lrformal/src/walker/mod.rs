//! Bottom-up rewriting and read-only traversal of terms and formulas.
//!
//! A rewrite pass implements [`Rewriter`]: one method per node kind, each receiving the
//! node's already rewritten children and returning the replacement node. Every method
//! defaults to rebuilding the node unchanged, so a pass only overrides the kinds it cares
//! about. [`rewrite_formula`] and [`rewrite_term`] drive a pass over a whole tree.
//!
//! Traversal strategy
//! - Iteration with an explicit task stack and two value stacks (no recursion), so deeply
//!   nested path formulas cannot overflow the call stack.
//! - Children are rewritten left to right before their parent; a rewritten node is not
//!   visited again.
//!
//! Performance and memory footprint
//! - Time: O(n) rewrite calls for a tree of n nodes, plus whatever the pass does per node.
//! - Memory: O(n) in the worst case for the task stack; nodes are moved, never cloned.
//!
//! Example: rename every variable
//! ```
//! use lrformal::prelude::*;
//! use lrformal::walker::{Rewriter, rewrite_formula};
//!
//! struct Prime;
//! impl Rewriter for Prime {
//!     fn rewrite_var(&mut self, v: Variable) -> Term {
//!         Term::Var(Variable::primed(v.name()))
//!     }
//! }
//!
//! let f = lt(Term::var("x"), Term::var("y"));
//! assert_eq!(rewrite_formula(f, &mut Prime).to_string(), "x' < y'");
//! ```

mod internal;

use std::collections::BTreeSet;

use num_bigint::BigInt;

use crate::{
    expr::{CmpOp, Formula, Term},
    variable::Variable,
};
use internal::{Node, Task, Values, schedule_formula, schedule_term};

/// One rewrite step per node kind; children arrive already rewritten.
pub trait Rewriter {
    fn rewrite_var(&mut self, variable: Variable) -> Term {
        Term::Var(variable)
    }

    fn rewrite_const(&mut self, value: BigInt) -> Term {
        Term::Const(value)
    }

    fn rewrite_add(&mut self, args: Vec<Term>) -> Term {
        Term::Add(args)
    }

    fn rewrite_mul(&mut self, lhs: Term, rhs: Term) -> Term {
        Term::Mul(Box::new(lhs), Box::new(rhs))
    }

    fn rewrite_neg(&mut self, inner: Term) -> Term {
        Term::Neg(Box::new(inner))
    }

    fn rewrite_div(&mut self, lhs: Term, rhs: Term) -> Term {
        Term::Div(Box::new(lhs), Box::new(rhs))
    }

    fn rewrite_mod(&mut self, lhs: Term, rhs: Term) -> Term {
        Term::Mod(Box::new(lhs), Box::new(rhs))
    }

    fn rewrite_term_ite(&mut self, condition: Formula, then_branch: Term, else_branch: Term) -> Term {
        Term::Ite(
            Box::new(condition),
            Box::new(then_branch),
            Box::new(else_branch),
        )
    }

    fn rewrite_true(&mut self) -> Formula {
        Formula::True
    }

    fn rewrite_false(&mut self) -> Formula {
        Formula::False
    }

    fn rewrite_cmp(&mut self, op: CmpOp, lhs: Term, rhs: Term) -> Formula {
        Formula::Cmp(op, lhs, rhs)
    }

    fn rewrite_not(&mut self, inner: Formula) -> Formula {
        Formula::Not(Box::new(inner))
    }

    fn rewrite_and(&mut self, args: Vec<Formula>) -> Formula {
        Formula::And(args)
    }

    fn rewrite_or(&mut self, args: Vec<Formula>) -> Formula {
        Formula::Or(args)
    }

    fn rewrite_implies(&mut self, lhs: Formula, rhs: Formula) -> Formula {
        Formula::Implies(Box::new(lhs), Box::new(rhs))
    }

    fn rewrite_iff(&mut self, lhs: Formula, rhs: Formula) -> Formula {
        Formula::Iff(Box::new(lhs), Box::new(rhs))
    }

    fn rewrite_ite(&mut self, condition: Formula, then_branch: Formula, else_branch: Formula) -> Formula {
        Formula::Ite(
            Box::new(condition),
            Box::new(then_branch),
            Box::new(else_branch),
        )
    }
}

fn run<R: Rewriter + ?Sized>(mut tasks: Vec<Task>, rewriter: &mut R) -> Values {
    let mut values = Values::default();

    while let Some(task) = tasks.pop() {
        match task {
            Task::Term(term) => {
                if let Some(leaf) = schedule_term(term, &mut tasks) {
                    let rewritten = match leaf {
                        Term::Var(variable) => rewriter.rewrite_var(variable),
                        Term::Const(value) => rewriter.rewrite_const(value),
                        _ => unreachable!("only leaves are returned by the scheduler"),
                    };
                    values.terms.push(rewritten);
                }
            }
            Task::Formula(formula) => {
                if let Some(leaf) = schedule_formula(formula, &mut tasks) {
                    let rewritten = match leaf {
                        Formula::True => rewriter.rewrite_true(),
                        Formula::False => rewriter.rewrite_false(),
                        _ => unreachable!("only leaves are returned by the scheduler"),
                    };
                    values.formulas.push(rewritten);
                }
            }
            Task::Build(node) => build(node, &mut values, rewriter),
        }
    }

    values
}

fn build<R: Rewriter + ?Sized>(node: Node, values: &mut Values, rewriter: &mut R) {
    match node {
        Node::Add(n) => {
            let args = values.pop_terms(n);
            let term = rewriter.rewrite_add(args);
            values.terms.push(term);
        }
        Node::Mul | Node::Div | Node::Mod => {
            let rhs = values.pop_term();
            let lhs = values.pop_term();
            let term = match node {
                Node::Mul => rewriter.rewrite_mul(lhs, rhs),
                Node::Div => rewriter.rewrite_div(lhs, rhs),
                _ => rewriter.rewrite_mod(lhs, rhs),
            };
            values.terms.push(term);
        }
        Node::Neg => {
            let inner = values.pop_term();
            let term = rewriter.rewrite_neg(inner);
            values.terms.push(term);
        }
        Node::TermIte => {
            let else_branch = values.pop_term();
            let then_branch = values.pop_term();
            let condition = values.pop_formula();
            let term = rewriter.rewrite_term_ite(condition, then_branch, else_branch);
            values.terms.push(term);
        }
        Node::Cmp(op) => {
            let rhs = values.pop_term();
            let lhs = values.pop_term();
            let formula = rewriter.rewrite_cmp(op, lhs, rhs);
            values.formulas.push(formula);
        }
        Node::Not => {
            let inner = values.pop_formula();
            let formula = rewriter.rewrite_not(inner);
            values.formulas.push(formula);
        }
        Node::And(n) => {
            let args = values.pop_formulas(n);
            let formula = rewriter.rewrite_and(args);
            values.formulas.push(formula);
        }
        Node::Or(n) => {
            let args = values.pop_formulas(n);
            let formula = rewriter.rewrite_or(args);
            values.formulas.push(formula);
        }
        Node::Implies | Node::Iff => {
            let rhs = values.pop_formula();
            let lhs = values.pop_formula();
            let formula = match node {
                Node::Implies => rewriter.rewrite_implies(lhs, rhs),
                _ => rewriter.rewrite_iff(lhs, rhs),
            };
            values.formulas.push(formula);
        }
        Node::Ite => {
            let else_branch = values.pop_formula();
            let then_branch = values.pop_formula();
            let condition = values.pop_formula();
            let formula = rewriter.rewrite_ite(condition, then_branch, else_branch);
            values.formulas.push(formula);
        }
    }
}

/// Rewrite `formula` bottom-up with `rewriter`.
pub fn rewrite_formula<R: Rewriter + ?Sized>(formula: Formula, rewriter: &mut R) -> Formula {
    let mut values = run(vec![Task::Formula(formula)], rewriter);
    debug_assert!(values.terms.is_empty() && values.formulas.len() == 1);
    values.pop_formula()
}

/// Rewrite `term` bottom-up with `rewriter`.
pub fn rewrite_term<R: Rewriter + ?Sized>(term: Term, rewriter: &mut R) -> Term {
    let mut values = run(vec![Task::Term(term)], rewriter);
    debug_assert!(values.formulas.is_empty() && values.terms.len() == 1);
    values.pop_term()
}

enum NodeRef<'a> {
    Formula(&'a Formula),
    Term(&'a Term),
}

/// Call `visit` on every variable occurrence of `formula`, left to right.
pub fn for_each_variable<'a>(formula: &'a Formula, mut visit: impl FnMut(&'a Variable)) {
    let mut stack = vec![NodeRef::Formula(formula)];
    while let Some(node) = stack.pop() {
        match node {
            NodeRef::Term(term) => match term {
                Term::Var(variable) => visit(variable),
                Term::Const(_) => {}
                Term::Add(args) => stack.extend(args.iter().rev().map(NodeRef::Term)),
                Term::Mul(lhs, rhs) | Term::Div(lhs, rhs) | Term::Mod(lhs, rhs) => {
                    stack.push(NodeRef::Term(rhs));
                    stack.push(NodeRef::Term(lhs));
                }
                Term::Neg(inner) => stack.push(NodeRef::Term(inner)),
                Term::Ite(condition, then_branch, else_branch) => {
                    stack.push(NodeRef::Term(else_branch));
                    stack.push(NodeRef::Term(then_branch));
                    stack.push(NodeRef::Formula(condition));
                }
            },
            NodeRef::Formula(formula) => match formula {
                Formula::True | Formula::False => {}
                Formula::Cmp(_, lhs, rhs) => {
                    stack.push(NodeRef::Term(rhs));
                    stack.push(NodeRef::Term(lhs));
                }
                Formula::Not(inner) => stack.push(NodeRef::Formula(inner)),
                Formula::And(args) | Formula::Or(args) => {
                    stack.extend(args.iter().rev().map(NodeRef::Formula))
                }
                Formula::Implies(lhs, rhs) | Formula::Iff(lhs, rhs) => {
                    stack.push(NodeRef::Formula(rhs));
                    stack.push(NodeRef::Formula(lhs));
                }
                Formula::Ite(condition, then_branch, else_branch) => {
                    stack.push(NodeRef::Formula(else_branch));
                    stack.push(NodeRef::Formula(then_branch));
                    stack.push(NodeRef::Formula(condition));
                }
            },
        }
    }
}

/// Free variables of `formula`.
pub fn collect_variables(formula: &Formula) -> BTreeSet<Variable> {
    let mut variables = BTreeSet::new();
    for_each_variable(formula, |variable| {
        if !variables.contains(variable) {
            variables.insert(variable.clone());
        }
    });
    variables
}
