use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use verbena_model::{DeviceId, GeoLocation, MetricValue, TelemetryId};

use crate::MAX_FUTURE_SKEW_SECONDS;
use crate::error::TelemetryError;

/// One telemetry record from one device.
///
/// Records are immutable after construction: the constructor validates and
/// there are no mutating accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryData {
  id: TelemetryId,
  device_id: DeviceId,
  timestamp: DateTime<Utc>,
  metrics: HashMap<String, MetricValue>,
  #[serde(skip_serializing_if = "Option::is_none")]
  location: Option<GeoLocation>,
  organization_id: String,
}

impl TelemetryData {
  /// Create a record with a generated id.
  pub fn new(
    device_id: DeviceId,
    organization_id: impl Into<String>,
    timestamp: DateTime<Utc>,
    metrics: HashMap<String, MetricValue>,
    location: Option<GeoLocation>,
  ) -> Result<Self, TelemetryError> {
    let record = Self {
      id: TelemetryId::generate(),
      device_id,
      timestamp,
      metrics,
      location,
      organization_id: organization_id.into(),
    };
    record.validate()?;
    Ok(record)
  }

  /// Check the record-quality invariants: non-empty metrics, a non-empty
  /// organization, and a timestamp no more than 60 seconds in the future.
  ///
  /// Also used as the ingestion quality gate for records that arrived
  /// through deserialization rather than [`TelemetryData::new`].
  pub fn validate(&self) -> Result<(), TelemetryError> {
    if self.metrics.is_empty() {
      return Err(TelemetryError::EmptyMetrics);
    }
    if self.organization_id.trim().is_empty() {
      return Err(TelemetryError::EmptyOrganization);
    }
    let horizon = Utc::now() + Duration::seconds(MAX_FUTURE_SKEW_SECONDS);
    if self.timestamp > horizon {
      return Err(TelemetryError::FutureTimestamp(self.timestamp));
    }
    Ok(())
  }

  pub fn id(&self) -> &TelemetryId {
    &self.id
  }

  pub fn device_id(&self) -> &DeviceId {
    &self.device_id
  }

  pub fn timestamp(&self) -> DateTime<Utc> {
    self.timestamp
  }

  pub fn metrics(&self) -> &HashMap<String, MetricValue> {
    &self.metrics
  }

  pub fn metric(&self, name: &str) -> Option<&MetricValue> {
    self.metrics.get(name)
  }

  pub fn location(&self) -> Option<&GeoLocation> {
    self.location.as_ref()
  }

  pub fn organization_id(&self) -> &str {
    &self.organization_id
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn metrics_with_temperature(value: f64) -> HashMap<String, MetricValue> {
    HashMap::from([("temperature".to_string(), MetricValue::Numeric(value))])
  }

  #[test]
  fn accepts_a_current_record() {
    let record = TelemetryData::new(
      DeviceId::new("sensor-1").unwrap(),
      "org-1",
      Utc::now(),
      metrics_with_temperature(21.5),
      None,
    )
    .unwrap();
    assert_eq!(record.metric("temperature").unwrap().numeric().unwrap(), 21.5);
  }

  #[test]
  fn rejects_empty_metrics() {
    let result = TelemetryData::new(
      DeviceId::new("sensor-1").unwrap(),
      "org-1",
      Utc::now(),
      HashMap::new(),
      None,
    );
    assert!(matches!(result, Err(TelemetryError::EmptyMetrics)));
  }

  #[test]
  fn rejects_far_future_timestamp() {
    let result = TelemetryData::new(
      DeviceId::new("sensor-1").unwrap(),
      "org-1",
      Utc::now() + Duration::seconds(120),
      metrics_with_temperature(21.5),
      None,
    );
    assert!(matches!(result, Err(TelemetryError::FutureTimestamp(_))));
  }

  #[test]
  fn tolerates_small_clock_skew() {
    let result = TelemetryData::new(
      DeviceId::new("sensor-1").unwrap(),
      "org-1",
      Utc::now() + Duration::seconds(30),
      metrics_with_temperature(21.5),
      None,
    );
    assert!(result.is_ok());
  }

  #[test]
  fn rejects_empty_organization() {
    let result = TelemetryData::new(
      DeviceId::new("sensor-1").unwrap(),
      "  ",
      Utc::now(),
      metrics_with_temperature(21.5),
      None,
    );
    assert!(matches!(result, Err(TelemetryError::EmptyOrganization)));
  }
}
