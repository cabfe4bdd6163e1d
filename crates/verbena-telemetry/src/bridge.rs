//! The threshold-to-workflow bridge.
//!
//! Thresholds are registered per organization. For each inbound record the
//! bridge checks every threshold of the record's organization and returns a
//! trigger event per violation. Thresholds are held in memory only;
//! persistence is the caller's concern.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::debug;

use crate::data::TelemetryData;
use crate::threshold::{TelemetryThreshold, WorkflowTriggerEvent};

/// Per-organization registry of telemetry thresholds.
///
/// Reads dominate (one per inbound record) and never block each other;
/// registration takes the write lock.
#[derive(Debug, Default)]
pub struct ThresholdRegistry {
  inner: RwLock<HashMap<String, Vec<TelemetryThreshold>>>,
}

impl ThresholdRegistry {
  pub fn new() -> Self {
    Self {
      inner: RwLock::new(HashMap::new()),
    }
  }

  /// Register a threshold under its organization.
  pub fn register(&self, threshold: TelemetryThreshold) {
    let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
    inner
      .entry(threshold.organization_id().to_string())
      .or_default()
      .push(threshold);
  }

  /// Remove a threshold by id. Returns whether anything was removed.
  pub fn unregister(&self, organization_id: &str, threshold_id: &str) -> bool {
    let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
    match inner.get_mut(organization_id) {
      Some(thresholds) => {
        let before = thresholds.len();
        thresholds.retain(|t| t.id() != threshold_id);
        thresholds.len() < before
      }
      None => false,
    }
  }

  /// The thresholds registered for an organization, as a defensive copy.
  pub fn thresholds(&self, organization_id: &str) -> Vec<TelemetryThreshold> {
    let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
    inner.get(organization_id).cloned().unwrap_or_default()
  }

  /// Evaluate a record against the thresholds of its organization.
  ///
  /// Missing or non-numeric metrics are skipped; a violated threshold
  /// yields one trigger event.
  pub fn evaluate(&self, record: &TelemetryData) -> Vec<WorkflowTriggerEvent> {
    let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
    let Some(thresholds) = inner.get(record.organization_id()) else {
      return Vec::new();
    };

    let mut events = Vec::new();
    for threshold in thresholds {
      let Some(metric) = record.metric(threshold.metric_name()) else {
        continue;
      };
      let Ok(observed) = metric.numeric() else {
        continue;
      };
      if threshold.comparison().matches(observed, threshold.value()) {
        debug!(
          organization_id = %record.organization_id(),
          workflow_id = %threshold.workflow_id(),
          metric = %threshold.metric_name(),
          observed,
          reference = threshold.value(),
          "threshold_fired"
        );
        events.push(WorkflowTriggerEvent {
          workflow_id: threshold.workflow_id().clone(),
          telemetry: record.clone(),
          threshold: threshold.clone(),
          fired_at: Utc::now(),
        });
      }
    }
    events
  }
}
