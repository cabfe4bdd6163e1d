use serde::{Deserialize, Serialize};

/// The condition algebra every surface form parses into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
  /// True when every child is true; true for an empty list.
  And(Vec<Condition>),
  /// True when any child is true; false for an empty list.
  Or(Vec<Condition>),
  /// Negation of its child.
  Not(Box<Condition>),
  /// A single field comparison. The operator is kept raw; unrecognized
  /// names evaluate to false and are surfaced as validation warnings.
  Leaf {
    field: String,
    operator: String,
    value: serde_json::Value,
  },
}

/// Recognized leaf comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafOp {
  Eq,
  Ne,
  Gt,
  Gte,
  Lt,
  Lte,
  Contains,
  In,
  Between,
}

impl LeafOp {
  /// Resolve an operator name, accepting case-insensitive aliases.
  pub fn parse(raw: &str) -> Option<LeafOp> {
    match raw.trim().to_lowercase().as_str() {
      "eq" | "equals" | "==" => Some(LeafOp::Eq),
      "ne" | "not_equals" | "!=" => Some(LeafOp::Ne),
      "gt" | ">" => Some(LeafOp::Gt),
      "gte" | ">=" => Some(LeafOp::Gte),
      "lt" | "<" => Some(LeafOp::Lt),
      "lte" | "<=" => Some(LeafOp::Lte),
      "contains" => Some(LeafOp::Contains),
      "in" => Some(LeafOp::In),
      "between" => Some(LeafOp::Between),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn operator_aliases() {
    assert_eq!(LeafOp::parse("GT"), Some(LeafOp::Gt));
    assert_eq!(LeafOp::parse(">"), Some(LeafOp::Gt));
    assert_eq!(LeafOp::parse("Equals"), Some(LeafOp::Eq));
    assert_eq!(LeafOp::parse("not_equals"), Some(LeafOp::Ne));
    assert_eq!(LeafOp::parse("BETWEEN"), Some(LeafOp::Between));
    assert_eq!(LeafOp::parse("matches"), None);
  }
}
