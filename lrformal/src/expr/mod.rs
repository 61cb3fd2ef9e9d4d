//! Terms and formulas of quantifier-free integer arithmetic.
//!
//! Path formulas, clauses and ranking conditions are all [`Formula`] values whose
//! atoms compare two [`Term`]s. Construction goes through the smart constructors on
//! [`Formula`] or the overloaded operators and free functions of [`ops`].

mod formula;
/// Operator overloading and `eq`/`lt`/... builders.
pub mod ops;
/// Colored, width-aware printing.
pub mod pretty;
mod term;

pub use formula::{CmpOp, Formula};
pub use term::{Model, Term, euclid_div_rem};
