//! Lassos: a stem transition followed by a loop transition, both linear.

pub mod builder;
pub mod classifier;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use lrformal::prelude::{Formula, Polyhedron, Variable};

pub use builder::{BuiltLassos, LassoBuilder};
pub use classifier::classify_variables;

/// Disjunction of polyhedra with the instances standing for each rank variable before
/// (`in_vars`) and after (`out_vars`) the transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearTransition {
    pub polyhedra: Vec<Polyhedron>,
    pub in_vars: BTreeMap<String, Variable>,
    pub out_vars: BTreeMap<String, Variable>,
}

impl LinearTransition {
    pub fn new(
        polyhedra: Vec<Polyhedron>,
        in_vars: BTreeMap<String, Variable>,
        out_vars: BTreeMap<String, Variable>,
    ) -> Self {
        Self {
            polyhedra,
            in_vars,
            out_vars,
        }
    }

    /// Transition allowing everything and exposing no rank variable.
    pub fn trivial() -> Self {
        Self::new(vec![Polyhedron::universe()], BTreeMap::new(), BTreeMap::new())
    }

    /// Instances that are neither an in nor an out variable.
    pub fn aux_vars(&self) -> BTreeSet<Variable> {
        let exposed: BTreeSet<&Variable> =
            self.in_vars.values().chain(self.out_vars.values()).collect();
        self.polyhedra
            .iter()
            .flat_map(Polyhedron::variables)
            .filter(|variable| !exposed.contains(variable))
            .collect()
    }

    /// Whether the transition constrains nothing and exposes no rank variable.
    pub fn is_trivial(&self) -> bool {
        self.in_vars.is_empty()
            && self.out_vars.is_empty()
            && self.polyhedra.iter().all(Polyhedron::is_universe)
    }

    pub fn to_formula(&self) -> Formula {
        Formula::or(self.polyhedra.iter().map(Polyhedron::to_formula))
    }
}

impl fmt::Display for LinearTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |vars: &BTreeMap<String, Variable>| {
            vars.iter()
                .map(|(name, instance)| format!("{name} -> {instance}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        writeln!(f, "in:  {{{}}}", show(&self.in_vars))?;
        writeln!(f, "out: {{{}}}", show(&self.out_vars))?;
        for (i, polyhedron) in self.polyhedra.iter().enumerate() {
            if i > 0 {
                writeln!(f, "  \\/")?;
            }
            writeln!(f, "  {polyhedron}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lasso {
    pub stem: LinearTransition,
    pub loop_transition: LinearTransition,
    /// Set when the path had no loop edges at all.
    empty_loop: bool,
}

impl Lasso {
    pub fn new(stem: LinearTransition, loop_transition: LinearTransition) -> Self {
        Self {
            stem,
            loop_transition,
            empty_loop: false,
        }
    }

    /// Lasso of a path whose loop segment is empty.
    pub fn without_loop(stem: LinearTransition) -> Self {
        Self {
            stem,
            loop_transition: LinearTransition::trivial(),
            empty_loop: true,
        }
    }

    /// No ranking or witness is attempted for a lasso built without loop edges. A loop
    /// whose body happens to constrain nothing (`while (1);`) is not degenerate.
    pub fn is_degenerate(&self) -> bool {
        self.empty_loop
    }
}

impl fmt::Display for Lasso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "stem:")?;
        write!(f, "{}", self.stem)?;
        writeln!(f, "loop:")?;
        write!(f, "{}", self.loop_transition)
    }
}
