//! Structural validation of raw condition values.
//!
//! Unlike evaluation, validation visits the whole tree and collects every
//! problem instead of stopping at the first.

use serde_json::Value;
use verbena_model::ValidationResult;

use crate::condition::LeafOp;
use crate::parse::parse_string_form;

const LOGICAL_OPERATORS: [&str; 3] = ["AND", "OR", "NOT"];

/// Walk a raw condition value, collecting structural errors and operator
/// warnings.
pub fn validate_conditions(value: &Value) -> ValidationResult {
  let mut result = ValidationResult::new();
  walk(value, &mut result);
  result
}

fn walk(value: &Value, result: &mut ValidationResult) {
  match value {
    Value::Array(items) => {
      for item in items {
        walk(item, result);
      }
    }
    Value::String(expression) => {
      if let Err(e) = parse_string_form(expression) {
        result.add_error(e.to_string());
      }
    }
    Value::Object(map) if map.contains_key("conditions") => {
      match map.get("operator") {
        None => {}
        Some(Value::String(s)) if s.trim().is_empty() => {
          result.add_error("composite condition has an empty operator");
        }
        Some(Value::String(s)) => {
          if !LOGICAL_OPERATORS.contains(&s.trim().to_uppercase().as_str()) {
            result.add_error(format!("unknown logical operator '{s}'"));
          }
        }
        Some(_) => result.add_error("composite operator must be a string"),
      }
      match map.get("conditions") {
        Some(Value::Array(items)) if items.is_empty() => {
          result.add_error("composite condition has an empty conditions array");
        }
        Some(Value::Array(items)) => {
          for item in items {
            walk(item, result);
          }
        }
        _ => result.add_error("composite 'conditions' must be an array"),
      }
    }
    Value::Object(map) => {
      match map.get("field").and_then(Value::as_str) {
        None => result.add_error("condition leaf is missing 'field'"),
        Some(field) if field.trim().is_empty() => {
          result.add_error("condition leaf has an empty field");
        }
        Some(_) => {}
      }
      match map.get("operator").and_then(Value::as_str) {
        None => result.add_error("condition leaf is missing 'operator'"),
        Some(operator) if operator.trim().is_empty() => {
          result.add_error("condition leaf has an empty operator");
        }
        Some(operator) => {
          if LeafOp::parse(operator).is_none() {
            result.add_warning(format!("unknown operator '{operator}'"));
          }
        }
      }
      if !map.contains_key("value") {
        result.add_error("condition leaf is missing 'value'");
      }
    }
    other => result.add_error(format!("unsupported condition value: {other}")),
  }
}
