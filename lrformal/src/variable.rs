//! Program variables as they occur in path formulas.
//!
//! A [`Variable`] is a name plus an optional SSA index. Path formulas talk about
//! instantiated variables (`x@3`), while ranking relations and the set of variables
//! relevant to termination use the bare, uninstantiated name (`x`).
use std::{fmt, sync::Arc};

/// Prefix reserved for variables introduced by the analysis itself.
pub const AUX_PREFIX: &str = "__";

/// Prefix of placeholders standing for nondeterministic inputs.
pub const NONDET_PREFIX: &str = "__nondet";

/// Suffix marking the post-state copy of a variable inside a transition relation.
pub const PRIME_SUFFIX: char = '\'';

/// Separator between a name and its SSA index in printed form.
pub const INDEX_SEPARATOR: char = '@';

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable {
    name: Arc<str>,
    index: Option<u32>,
}

impl Variable {
    /// Uninstantiated variable.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    /// SSA instance `name@index`.
    pub fn indexed(name: impl Into<Arc<str>>, index: u32) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }

    /// Post-state copy `name'` used by transition relations.
    pub fn primed(name: &str) -> Self {
        Self::new(format!("{name}{PRIME_SUFFIX}"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn with_index(&self, index: u32) -> Self {
        Self {
            name: self.name.clone(),
            index: Some(index),
        }
    }

    /// Drop the SSA index, keeping the name.
    pub fn uninstantiated(&self) -> Self {
        Self {
            name: self.name.clone(),
            index: None,
        }
    }

    /// Whether the variable was minted by the analysis (elimination passes, placeholders).
    pub fn is_auxiliary(&self) -> bool {
        self.name.starts_with(AUX_PREFIX)
    }

    pub fn is_nondet(&self) -> bool {
        self.name.starts_with(NONDET_PREFIX)
    }

    pub fn is_primed(&self) -> bool {
        self.name.ends_with(PRIME_SUFFIX)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}{INDEX_SEPARATOR}{index}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Counter minting fresh auxiliary variables.
///
/// Every normalizer owns its own instance, so two analyses never hand out the same
/// name for different purposes, while a single normalizer never repeats itself.
#[derive(Debug, Default, Clone)]
pub struct FreshNames {
    next: u64,
}

impl FreshNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh variable `__{kind}{n}`.
    pub fn fresh(&mut self, kind: &str) -> Variable {
        let variable = Variable::new(format!("{AUX_PREFIX}{kind}{}", self.next));
        self.next += 1;
        variable
    }

    /// Number of names issued so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_index() {
        assert_eq!(Variable::indexed("x", 3).to_string(), "x@3");
        assert_eq!(Variable::new("y").to_string(), "y");
        assert_eq!(Variable::primed("y").to_string(), "y'");
    }

    #[test]
    fn fresh_names_never_repeat() {
        let mut fresh = FreshNames::new();
        let a = fresh.fresh("q");
        let b = fresh.fresh("q");
        assert_ne!(a, b);
        assert!(a.is_auxiliary() && b.is_auxiliary());
        assert_eq!(fresh.issued(), 2);

        let mut other = FreshNames::new();
        assert_eq!(other.fresh("q"), a);
    }

    #[test]
    fn reserved_prefixes() {
        assert!(Variable::indexed("__nondet", 2).is_nondet());
        assert!(Variable::new("__nondet").is_auxiliary());
        assert!(!Variable::new("x").is_auxiliary());
    }
}
