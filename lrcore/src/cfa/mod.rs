//! Path formulas over SSA-indexed variables.
//!
//! A counterexample path is a sequence of [`PathPosition`]s. Its edges are turned into a
//! [`PathFormula`] by a [`PathFormulaManager`]; every assignment bumps the SSA index of
//! its target, so the formula of a path mentions one instance per write.

pub mod encoder;

use std::{collections::BTreeMap, fmt};

use lrformal::prelude::{Formula, Variable};

use crate::utils::error::LrResult;

/// Index of a variable that was never written on the current path.
pub const DEFAULT_INDEX: u32 = 1;

/// Variable name to current SSA index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SsaMap {
    indices: BTreeMap<String, u32>,
}

impl SsaMap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder(&self) -> SsaMapBuilder {
        SsaMapBuilder {
            indices: self.indices.clone(),
        }
    }

    /// Index recorded for `name`, if any.
    pub fn get(&self, name: &str) -> Option<u32> {
        self.indices.get(name).copied()
    }

    /// Index recorded for `name`, or [`DEFAULT_INDEX`] for an untouched variable.
    pub fn index_or_default(&self, name: &str) -> u32 {
        self.get(name).unwrap_or(DEFAULT_INDEX)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.indices.iter().map(|(name, index)| (name.as_str(), *index))
    }

    /// Instance of `name` at its current index.
    pub fn instance(&self, name: &str) -> Variable {
        Variable::indexed(name, self.index_or_default(name))
    }

    /// Whether `variable` is an instance that is not visible at the boundary described
    /// by this map. Uninstantiated variables are never intermediate.
    pub fn is_intermediate(&self, variable: &Variable) -> bool {
        match variable.index() {
            Some(index) => self.get(variable.name()) != Some(index),
            None => false,
        }
    }
}

impl fmt::Display for SsaMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, index)) in self.indices.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {index}")?;
        }
        f.write_str("}")
    }
}

/// Mutable staging area for a new [`SsaMap`].
#[derive(Debug, Clone, Default)]
pub struct SsaMapBuilder {
    indices: BTreeMap<String, u32>,
}

impl SsaMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.indices.get(name).copied()
    }

    pub fn set(&mut self, name: impl Into<String>, index: u32) -> &mut Self {
        self.indices.insert(name.into(), index);
        self
    }

    /// Record `name` at [`DEFAULT_INDEX`] unless already present, returning its index.
    pub fn touch(&mut self, name: &str) -> u32 {
        *self
            .indices
            .entry(name.to_string())
            .or_insert(DEFAULT_INDEX)
    }

    /// Bump the index of `name` and return the new one.
    pub fn bump(&mut self, name: &str) -> u32 {
        let next = self.get(name).unwrap_or(DEFAULT_INDEX) + 1;
        self.indices.insert(name.to_string(), next);
        next
    }

    pub fn build(self) -> SsaMap {
        SsaMap {
            indices: self.indices,
        }
    }
}

/// Formula of a path segment together with the SSA indices at its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFormula {
    pub formula: Formula,
    pub ssa: SsaMap,
    /// Number of edges encoded.
    pub length: usize,
}

impl PathFormula {
    pub fn empty() -> Self {
        Self {
            formula: Formula::True,
            ssa: SsaMap::empty(),
            length: 0,
        }
    }
}

impl fmt::Display for PathFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with {}", self.formula, self.ssa)
    }
}

/// One state of a counterexample path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPosition<E> {
    /// Edge leading into this state; `None` for the initial state only.
    pub incoming_edge: Option<E>,
    /// Whether the incoming edge belongs to the repeated loop segment.
    pub in_loop: bool,
}

impl<E> PathPosition<E> {
    pub fn initial() -> Self {
        Self {
            incoming_edge: None,
            in_loop: false,
        }
    }

    pub fn stem(edge: E) -> Self {
        Self {
            incoming_edge: Some(edge),
            in_loop: false,
        }
    }

    pub fn looping(edge: E) -> Self {
        Self {
            incoming_edge: Some(edge),
            in_loop: true,
        }
    }
}

/// Encodes program edges into path formulas.
pub trait PathFormulaManager {
    type Edge;

    fn empty_formula(&self) -> PathFormula {
        PathFormula::empty()
    }

    /// Empty formula that continues the SSA indices of `context`.
    fn empty_formula_with_context(&self, context: &PathFormula) -> PathFormula {
        PathFormula {
            formula: Formula::True,
            ssa: context.ssa.clone(),
            length: 0,
        }
    }

    /// Extend `formula` by one edge.
    fn make_and(&self, formula: &PathFormula, edge: &Self::Edge) -> LrResult<PathFormula>;

    /// Encode `edges` in order, starting from the empty formula.
    fn formula_for_edges<'e>(
        &self,
        edges: impl IntoIterator<Item = &'e Self::Edge>,
    ) -> LrResult<PathFormula>
    where
        Self::Edge: 'e,
    {
        edges
            .into_iter()
            .try_fold(self.empty_formula(), |formula, edge| {
                self.make_and(&formula, edge)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intermediate_instances() {
        let mut builder = SsaMapBuilder::new();
        builder.set("x", 3).set("y", 1);
        let ssa = builder.build();

        assert!(!ssa.is_intermediate(&Variable::indexed("x", 3)));
        assert!(ssa.is_intermediate(&Variable::indexed("x", 2)));
        assert!(ssa.is_intermediate(&Variable::indexed("z", 1)));
        assert!(!ssa.is_intermediate(&Variable::new("x")));
        assert!(SsaMap::empty().is_intermediate(&Variable::indexed("y", 1)));
    }

    #[test]
    fn builder_bumps_from_default() {
        let mut builder = SsaMap::empty().builder();
        assert_eq!(builder.touch("x"), DEFAULT_INDEX);
        assert_eq!(builder.bump("x"), 2);
        assert_eq!(builder.bump("y"), 2);
        let ssa = builder.build();
        assert_eq!(ssa.to_string(), "{x: 2, y: 2}");
        assert_eq!(ssa.index_or_default("z"), DEFAULT_INDEX);
        assert!(!ssa.contains("z"));
    }
}
