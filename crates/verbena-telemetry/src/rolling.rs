//! Short sliding-window aggregates over ingested telemetry.
//!
//! The ingestion pipeline records every numeric metric here; readers pull
//! snapshots for recent-aggregate queries. Samples older than the window
//! are pruned on both write and read.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::data::TelemetryData;

/// Default window length in seconds.
const DEFAULT_WINDOW_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
  organization_id: String,
  device_id: String,
  metric: String,
}

/// Aggregate view of one series over the current window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
  pub count: usize,
  pub min: f64,
  pub max: f64,
  pub avg: f64,
}

/// Rolling per-(organization, device, metric) aggregates over a sliding
/// window.
#[derive(Debug)]
pub struct RollingAggregates {
  window: Duration,
  series: Mutex<HashMap<SeriesKey, VecDeque<(DateTime<Utc>, f64)>>>,
}

impl RollingAggregates {
  pub fn new() -> Self {
    Self::with_window(Duration::seconds(DEFAULT_WINDOW_SECONDS))
  }

  pub fn with_window(window: Duration) -> Self {
    Self {
      window,
      series: Mutex::new(HashMap::new()),
    }
  }

  /// Record every numeric metric of an inbound record.
  pub fn record(&self, record: &TelemetryData) {
    let cutoff = Utc::now() - self.window;
    let mut series = self.series.lock().unwrap_or_else(|e| e.into_inner());

    for (name, value) in record.metrics() {
      let Ok(value) = value.numeric() else {
        continue;
      };
      let key = SeriesKey {
        organization_id: record.organization_id().to_string(),
        device_id: record.device_id().as_str().to_string(),
        metric: name.clone(),
      };
      let samples = series.entry(key).or_default();
      samples.push_back((record.timestamp(), value));
      while samples.front().is_some_and(|(t, _)| *t < cutoff) {
        samples.pop_front();
      }
    }
  }

  /// Aggregate the in-window samples of one series, if any remain.
  pub fn snapshot(
    &self,
    organization_id: &str,
    device_id: &str,
    metric: &str,
  ) -> Option<WindowSnapshot> {
    let cutoff = Utc::now() - self.window;
    let mut series = self.series.lock().unwrap_or_else(|e| e.into_inner());
    let key = SeriesKey {
      organization_id: organization_id.to_string(),
      device_id: device_id.to_string(),
      metric: metric.to_string(),
    };

    let samples = series.get_mut(&key)?;
    while samples.front().is_some_and(|(t, _)| *t < cutoff) {
      samples.pop_front();
    }
    if samples.is_empty() {
      return None;
    }

    let values: Vec<f64> = samples.iter().map(|(_, v)| *v).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Some(WindowSnapshot {
      count: values.len(),
      min,
      max,
      avg,
    })
  }
}

impl Default for RollingAggregates {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap as StdHashMap;

  use verbena_model::{DeviceId, MetricValue};

  fn record_at(timestamp: DateTime<Utc>, value: f64) -> TelemetryData {
    TelemetryData::new(
      DeviceId::new("sensor-1").unwrap(),
      "org-1",
      timestamp,
      StdHashMap::from([("temperature".to_string(), MetricValue::Numeric(value))]),
      None,
    )
    .unwrap()
  }

  #[test]
  fn aggregates_in_window_samples() {
    let aggregates = RollingAggregates::new();
    let now = Utc::now();
    aggregates.record(&record_at(now, 10.0));
    aggregates.record(&record_at(now, 20.0));
    aggregates.record(&record_at(now, 30.0));

    let snapshot = aggregates.snapshot("org-1", "sensor-1", "temperature").unwrap();
    assert_eq!(snapshot.count, 3);
    assert_eq!(snapshot.min, 10.0);
    assert_eq!(snapshot.max, 30.0);
    assert_eq!(snapshot.avg, 20.0);
  }

  #[test]
  fn prunes_samples_older_than_window() {
    let aggregates = RollingAggregates::new();
    let now = Utc::now();
    aggregates.record(&record_at(now - Duration::seconds(120), 99.0));
    aggregates.record(&record_at(now, 10.0));

    let snapshot = aggregates.snapshot("org-1", "sensor-1", "temperature").unwrap();
    assert_eq!(snapshot.count, 1);
    assert_eq!(snapshot.max, 10.0);
  }

  #[test]
  fn unknown_series_yields_nothing() {
    let aggregates = RollingAggregates::new();
    assert!(aggregates.snapshot("org-1", "sensor-1", "humidity").is_none());
  }
}
