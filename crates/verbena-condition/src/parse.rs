//! Surface-form parsing into the [`Condition`] algebra.

use serde_json::Value;

use crate::condition::Condition;
use crate::error::ConditionError;

/// Comparison symbols of the string form. Two-character symbols come
/// first so `>=` is not split into `>` and `=`.
const STRING_FORM_OPS: [&str; 6] = [">=", "<=", "==", "!=", ">", "<"];

impl Condition {
  /// Parse any of the surface forms into the algebra.
  pub fn from_value(value: &Value) -> Result<Condition, ConditionError> {
    match value {
      Value::Array(items) => {
        let children = items
          .iter()
          .map(Condition::from_value)
          .collect::<Result<Vec<_>, _>>()?;
        Ok(Condition::And(children))
      }
      Value::String(expression) => parse_string_form(expression),
      Value::Object(map) if map.contains_key("conditions") => {
        let operator = match map.get("operator") {
          None => "AND".to_string(),
          Some(Value::String(s)) => s.trim().to_uppercase(),
          Some(other) => {
            return Err(ConditionError::UnknownLogicalOperator(other.to_string()));
          }
        };
        let children = match map.get("conditions") {
          Some(Value::Array(items)) => items
            .iter()
            .map(Condition::from_value)
            .collect::<Result<Vec<_>, _>>()?,
          _ => {
            return Err(ConditionError::UnsupportedValue(
              "'conditions' must be an array".to_string(),
            ));
          }
        };
        match operator.as_str() {
          "AND" => Ok(Condition::And(children)),
          "OR" => Ok(Condition::Or(children)),
          // NOT is negation of the conjunction of its children.
          "NOT" => Ok(Condition::Not(Box::new(Condition::And(children)))),
          other => Err(ConditionError::UnknownLogicalOperator(other.to_string())),
        }
      }
      Value::Object(map) => {
        let field = map
          .get("field")
          .and_then(Value::as_str)
          .ok_or(ConditionError::MissingKey("field"))?;
        let operator = map
          .get("operator")
          .and_then(Value::as_str)
          .ok_or(ConditionError::MissingKey("operator"))?;
        let value = map
          .get("value")
          .ok_or(ConditionError::MissingKey("value"))?
          .clone();
        Ok(Condition::Leaf {
          field: field.to_string(),
          operator: operator.to_string(),
          value,
        })
      }
      other => Err(ConditionError::UnsupportedValue(other.to_string())),
    }
  }
}

/// Parse `"<field> <op> <literal>"` in one pass.
pub(crate) fn parse_string_form(expression: &str) -> Result<Condition, ConditionError> {
  let trimmed = expression.trim();
  for op in STRING_FORM_OPS {
    let Some(pos) = trimmed.find(op) else {
      continue;
    };
    let field = trimmed[..pos].trim();
    let literal = trimmed[pos + op.len()..].trim();
    if field.is_empty() || literal.is_empty() {
      return Err(ConditionError::MalformedExpression(expression.to_string()));
    }
    return Ok(Condition::Leaf {
      field: field.to_string(),
      operator: op.to_string(),
      value: parse_literal(literal),
    });
  }
  Err(ConditionError::MalformedExpression(expression.to_string()))
}

/// A literal is a number, a boolean, or a (possibly quoted) string.
fn parse_literal(raw: &str) -> Value {
  if let Ok(number) = raw.parse::<f64>() {
    return serde_json::json!(number);
  }
  match raw {
    "true" => return Value::Bool(true),
    "false" => return Value::Bool(false),
    _ => {}
  }
  let unquoted = raw
    .strip_prefix('"')
    .and_then(|s| s.strip_suffix('"'))
    .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
    .unwrap_or(raw);
  Value::String(unquoted.to_string())
}
