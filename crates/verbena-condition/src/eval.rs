//! Recursive condition evaluation against a telemetry record.

use serde_json::Value;
use verbena_model::MetricValue;
use verbena_telemetry::TelemetryData;

use crate::condition::{Condition, LeafOp};
use crate::error::ConditionError;

/// Parse a raw condition value and evaluate it against a record.
///
/// Structural defects in the value fail the whole evaluation; everything
/// else is total.
pub fn evaluate(
  conditions: &Value,
  record: Option<&TelemetryData>,
) -> Result<bool, ConditionError> {
  let condition = Condition::from_value(conditions)?;
  Ok(evaluate_condition(&condition, record))
}

/// Evaluate a parsed condition. Children are visited left to right with
/// short-circuiting.
pub fn evaluate_condition(condition: &Condition, record: Option<&TelemetryData>) -> bool {
  match condition {
    Condition::And(children) => children.iter().all(|c| evaluate_condition(c, record)),
    Condition::Or(children) => children.iter().any(|c| evaluate_condition(c, record)),
    Condition::Not(inner) => !evaluate_condition(inner, record),
    Condition::Leaf {
      field,
      operator,
      value,
    } => evaluate_leaf(field, operator, value, record),
  }
}

fn evaluate_leaf(
  field: &str,
  operator: &str,
  literal: &Value,
  record: Option<&TelemetryData>,
) -> bool {
  let Some(op) = LeafOp::parse(operator) else {
    // Unknown operator names are a validation warning, not a failure.
    return false;
  };

  // Synthetic fields consulted against the record itself rather than its
  // metrics. Unsupported combinations are false, never an error.
  match field {
    "deviceId" | "device_id" => {
      let Some(record) = record else {
        return false;
      };
      return match op {
        LeafOp::Eq => literal
          .as_str()
          .is_some_and(|s| record.device_id().as_str() == s),
        LeafOp::Contains => literal
          .as_str()
          .is_some_and(|s| record.device_id().as_str().contains(s)),
        _ => false,
      };
    }
    "timestamp" | "location" => return false,
    _ => {}
  }

  let Some(metric) = record.and_then(|r| r.metric(field)) else {
    return false;
  };

  match op {
    LeafOp::Eq => equals(metric, literal).unwrap_or(false),
    LeafOp::Ne => equals(metric, literal).map(|eq| !eq).unwrap_or(false),
    LeafOp::Gt => numeric_pair(metric, literal).is_some_and(|(m, l)| m > l),
    LeafOp::Gte => numeric_pair(metric, literal).is_some_and(|(m, l)| m >= l),
    LeafOp::Lt => numeric_pair(metric, literal).is_some_and(|(m, l)| m < l),
    LeafOp::Lte => numeric_pair(metric, literal).is_some_and(|(m, l)| m <= l),
    LeafOp::Contains => match (metric, literal.as_str()) {
      (MetricValue::String(haystack), Some(needle)) => haystack.contains(needle),
      _ => false,
    },
    LeafOp::In => literal
      .as_array()
      .is_some_and(|items| items.iter().any(|item| equals(metric, item) == Some(true))),
    LeafOp::Between => {
      let (Ok(observed), Some(map)) = (metric.numeric(), literal.as_object()) else {
        return false;
      };
      let (Some(min), Some(max)) = (
        map.get("min").and_then(Value::as_f64),
        map.get("max").and_then(Value::as_f64),
      ) else {
        return false;
      };
      observed >= min && observed <= max
    }
  }
}

/// Equality across the metric/literal type pair; `None` when the kinds are
/// not comparable.
fn equals(metric: &MetricValue, literal: &Value) -> Option<bool> {
  match (metric, literal) {
    (MetricValue::Numeric(m), Value::Number(n)) => n.as_f64().map(|l| *m == l),
    (MetricValue::String(m), Value::String(l)) => Some(m == l),
    (MetricValue::Boolean(m), Value::Bool(l)) => Some(m == l),
    _ => None,
  }
}

fn numeric_pair(metric: &MetricValue, literal: &Value) -> Option<(f64, f64)> {
  Some((metric.numeric().ok()?, literal.as_f64()?))
}
