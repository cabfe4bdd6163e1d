//! Metric values carried by telemetry records.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A single metric reading: numeric, string, or boolean.
///
/// The typed accessors fail when the stored tag does not match, so callers
/// never silently coerce across kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
  Numeric(f64),
  String(String),
  Boolean(bool),
}

impl MetricValue {
  pub fn kind(&self) -> &'static str {
    match self {
      MetricValue::Numeric(_) => "numeric",
      MetricValue::String(_) => "string",
      MetricValue::Boolean(_) => "boolean",
    }
  }

  pub fn numeric(&self) -> Result<f64, ModelError> {
    match self {
      MetricValue::Numeric(v) => Ok(*v),
      other => Err(ModelError::MetricTypeMismatch {
        expected: "numeric",
        actual: other.kind(),
      }),
    }
  }

  pub fn string(&self) -> Result<&str, ModelError> {
    match self {
      MetricValue::String(v) => Ok(v),
      other => Err(ModelError::MetricTypeMismatch {
        expected: "string",
        actual: other.kind(),
      }),
    }
  }

  pub fn boolean(&self) -> Result<bool, ModelError> {
    match self {
      MetricValue::Boolean(v) => Ok(*v),
      other => Err(ModelError::MetricTypeMismatch {
        expected: "boolean",
        actual: other.kind(),
      }),
    }
  }

  pub fn is_numeric(&self) -> bool {
    matches!(self, MetricValue::Numeric(_))
  }
}

impl From<f64> for MetricValue {
  fn from(value: f64) -> Self {
    MetricValue::Numeric(value)
  }
}

impl From<&str> for MetricValue {
  fn from(value: &str) -> Self {
    MetricValue::String(value.to_string())
  }
}

impl From<String> for MetricValue {
  fn from(value: String) -> Self {
    MetricValue::String(value)
  }
}

impl From<bool> for MetricValue {
  fn from(value: bool) -> Self {
    MetricValue::Boolean(value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accessor_returns_stored_value() {
    assert_eq!(MetricValue::Numeric(27.5).numeric().unwrap(), 27.5);
    assert_eq!(MetricValue::from("ok").string().unwrap(), "ok");
    assert!(MetricValue::Boolean(true).boolean().unwrap());
  }

  #[test]
  fn accessor_fails_on_wrong_tag() {
    let value = MetricValue::from("27.5");
    let err = value.numeric().unwrap_err();
    assert!(err.to_string().contains("expected numeric"));
    assert!(MetricValue::Numeric(1.0).boolean().is_err());
  }

  #[test]
  fn serializes_with_tag() {
    let json = serde_json::to_value(MetricValue::Numeric(3.0)).unwrap();
    assert_eq!(json["type"], "numeric");
    assert_eq!(json["value"], 3.0);
  }
}
