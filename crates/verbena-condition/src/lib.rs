//! Verbena Condition
//!
//! A small declarative boolean/comparison language evaluated against a
//! telemetry record. Conditions arrive in one of several surface forms:
//!
//! - a composite map `{ "operator": "AND"|"OR"|"NOT", "conditions": [...] }`
//!   (operator defaults to `AND`),
//! - a leaf map `{ "field": ..., "operator": ..., "value": ... }`,
//! - a list, read as an implicit `AND`,
//! - a string `"<field> <op> <literal>"`.
//!
//! All forms parse into the [`Condition`] algebra at the boundary and are
//! evaluated recursively. Evaluation of a well-formed tree is total: an
//! unknown field or a type mismatch makes the leaf false, never an error.
//! Structural defects (a leaf missing a key, an unknown logical operator,
//! a malformed string form) fail the whole evaluation.

mod condition;
mod error;
mod eval;
mod parse;
mod validate;

pub use condition::{Condition, LeafOp};
pub use error::ConditionError;
pub use eval::{evaluate, evaluate_condition};
pub use validate::validate_conditions;
