use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verbena_model::WorkflowId;

use crate::data::TelemetryData;

/// Tolerance for equality comparisons on floating-point metric values.
const EQUALITY_EPSILON: f64 = 1e-3;

/// Comparison operator of a telemetry threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdComparison {
  Gt,
  Lt,
  Eq,
  Ne,
  Gte,
  Lte,
}

impl ThresholdComparison {
  /// Compare an observed value against the threshold reference. `Eq`/`Ne`
  /// use a ±1e-3 tolerance.
  pub fn matches(&self, observed: f64, reference: f64) -> bool {
    match self {
      ThresholdComparison::Gt => observed > reference,
      ThresholdComparison::Lt => observed < reference,
      ThresholdComparison::Gte => observed >= reference,
      ThresholdComparison::Lte => observed <= reference,
      ThresholdComparison::Eq => (observed - reference).abs() < EQUALITY_EPSILON,
      ThresholdComparison::Ne => (observed - reference).abs() >= EQUALITY_EPSILON,
    }
  }
}

/// A registered pairing of (metric, comparison, value, workflow): when an
/// incoming record violates it, the bridge emits a trigger event for the
/// workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryThreshold {
  id: String,
  organization_id: String,
  workflow_id: WorkflowId,
  metric_name: String,
  comparison: ThresholdComparison,
  value: f64,
  description: String,
}

impl TelemetryThreshold {
  pub fn new(
    organization_id: impl Into<String>,
    workflow_id: WorkflowId,
    metric_name: impl Into<String>,
    comparison: ThresholdComparison,
    value: f64,
    description: impl Into<String>,
  ) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      organization_id: organization_id.into(),
      workflow_id,
      metric_name: metric_name.into(),
      comparison,
      value,
      description: description.into(),
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn organization_id(&self) -> &str {
    &self.organization_id
  }

  pub fn workflow_id(&self) -> &WorkflowId {
    &self.workflow_id
  }

  pub fn metric_name(&self) -> &str {
    &self.metric_name
  }

  pub fn comparison(&self) -> ThresholdComparison {
    self.comparison
  }

  pub fn value(&self) -> f64 {
    self.value
  }

  pub fn description(&self) -> &str {
    &self.description
  }
}

/// Emitted by the bridge when a record violates a threshold; consumed by
/// the engine's trigger queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTriggerEvent {
  pub workflow_id: WorkflowId,
  pub telemetry: TelemetryData,
  pub threshold: TelemetryThreshold,
  pub fired_at: DateTime<Utc>,
}
