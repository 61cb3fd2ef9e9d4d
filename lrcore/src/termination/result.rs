use std::fmt;

use strum::{EnumIs, EnumTryAs};

use crate::{ranking::RankingRelation, synthesis::NonTerminationArgument};

/// Outcome of the termination analysis of one loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, EnumIs, EnumTryAs)]
pub enum Verdict {
    #[default]
    Unknown,
    NonTerminating(NonTerminationArgument),
    Terminating(RankingRelation),
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Unknown => f.write_str("unknown"),
            Verdict::NonTerminating(argument) => write!(f, "non-terminating: {argument}"),
            Verdict::Terminating(relation) => write!(f, "terminating: {relation}"),
        }
    }
}
