//! The telemetry ingestion pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use verbena_store::TelemetryRepository;
use verbena_telemetry::{
  RollingAggregates, TelemetryData, ThresholdRegistry, WorkflowTriggerEvent,
};

/// Snapshot of the pipeline's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
  pub received: u64,
  pub accepted: u64,
  pub rejected: u64,
  pub repository_errors: u64,
  pub triggers_fired: u64,
}

#[derive(Debug, Default)]
struct Counters {
  received: AtomicU64,
  accepted: AtomicU64,
  rejected: AtomicU64,
  repository_errors: AtomicU64,
  triggers_fired: AtomicU64,
}

/// Consumes inbound telemetry: quality gate, persist, threshold bridge,
/// rolling aggregates.
///
/// Every record is handled in isolation; a bad record or a repository
/// failure is counted and logged, and the stream continues.
pub struct IngestionPipeline {
  repository: Arc<dyn TelemetryRepository>,
  registry: Arc<ThresholdRegistry>,
  aggregates: Arc<RollingAggregates>,
  triggers: mpsc::Sender<WorkflowTriggerEvent>,
  counters: Counters,
}

impl IngestionPipeline {
  pub fn new(
    repository: Arc<dyn TelemetryRepository>,
    registry: Arc<ThresholdRegistry>,
    triggers: mpsc::Sender<WorkflowTriggerEvent>,
  ) -> Self {
    Self {
      repository,
      registry,
      aggregates: Arc::new(RollingAggregates::new()),
      triggers,
      counters: Counters::default(),
    }
  }

  /// The rolling aggregates fed by this pipeline.
  pub fn aggregates(&self) -> Arc<RollingAggregates> {
    self.aggregates.clone()
  }

  /// Ingest one record. Returns whether it was accepted.
  #[instrument(
    name = "telemetry_ingest",
    skip(self, record),
    fields(
      record_id = %record.id(),
      device_id = %record.device_id(),
    )
  )]
  pub async fn ingest(&self, record: TelemetryData) -> bool {
    self.counters.received.fetch_add(1, Ordering::Relaxed);

    if let Err(e) = record.validate() {
      self.counters.rejected.fetch_add(1, Ordering::Relaxed);
      warn!(error = %e, "telemetry_rejected");
      return false;
    }

    let persisted = if record.location().is_some() {
      self.repository.save_spatial_data(&record).await
    } else {
      self.repository.save_time_series(&record).await
    };
    if let Err(e) = persisted {
      self.counters.repository_errors.fetch_add(1, Ordering::Relaxed);
      error!(error = %e, "telemetry_persist_failed");
      return false;
    }

    for event in self.registry.evaluate(&record) {
      self.counters.triggers_fired.fetch_add(1, Ordering::Relaxed);
      if self.triggers.send(event).await.is_err() {
        warn!("trigger queue closed, dropping trigger event");
      }
    }

    self.aggregates.record(&record);
    self.counters.accepted.fetch_add(1, Ordering::Relaxed);
    debug!("telemetry_accepted");
    true
  }

  /// Drain a record stream until it closes or the token fires.
  pub async fn run(
    &self,
    mut records: mpsc::Receiver<TelemetryData>,
    cancel: CancellationToken,
  ) {
    info!("ingestion pipeline started");
    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!("ingestion pipeline cancelled");
          break;
        }
        record = records.recv() => {
          match record {
            Some(record) => {
              self.ingest(record).await;
            }
            None => {
              info!("telemetry stream closed");
              break;
            }
          }
        }
      }
    }
  }

  pub fn stats(&self) -> IngestStats {
    IngestStats {
      received: self.counters.received.load(Ordering::Relaxed),
      accepted: self.counters.accepted.load(Ordering::Relaxed),
      rejected: self.counters.rejected.load(Ordering::Relaxed),
      repository_errors: self.counters.repository_errors.load(Ordering::Relaxed),
      triggers_fired: self.counters.triggers_fired.load(Ordering::Relaxed),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  use chrono::Utc;
  use serde_json::json;
  use verbena_model::{DeviceId, MetricValue, WorkflowId};
  use verbena_store::MemoryTelemetryRepository;
  use verbena_telemetry::{TelemetryThreshold, ThresholdComparison};

  fn pipeline_with_queue() -> (IngestionPipeline, mpsc::Receiver<WorkflowTriggerEvent>) {
    let (sender, receiver) = mpsc::channel(16);
    let pipeline = IngestionPipeline::new(
      Arc::new(MemoryTelemetryRepository::new()),
      Arc::new(ThresholdRegistry::new()),
      sender,
    );
    (pipeline, receiver)
  }

  fn record(temperature: f64) -> TelemetryData {
    TelemetryData::new(
      DeviceId::new("sensor-1").unwrap(),
      "org-1",
      Utc::now(),
      HashMap::from([("temperature".to_string(), MetricValue::Numeric(temperature))]),
      None,
    )
    .unwrap()
  }

  /// A record that bypassed construction-time validation, as one arriving
  /// off the wire would.
  fn invalid_record() -> TelemetryData {
    serde_json::from_value(json!({
      "id": "t-1",
      "device_id": "sensor-1",
      "timestamp": Utc::now().to_rfc3339(),
      "metrics": {},
      "organization_id": "org-1",
    }))
    .unwrap()
  }

  #[tokio::test]
  async fn accepts_valid_records() {
    let (pipeline, _queue) = pipeline_with_queue();
    assert!(pipeline.ingest(record(21.0)).await);

    let stats = pipeline.stats();
    assert_eq!(stats.received, 1);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.rejected, 0);
  }

  #[tokio::test]
  async fn bad_record_does_not_stop_the_stream() {
    let (pipeline, _queue) = pipeline_with_queue();

    assert!(!pipeline.ingest(invalid_record()).await);
    assert!(pipeline.ingest(record(21.0)).await);

    let stats = pipeline.stats();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.accepted, 1);
  }

  #[tokio::test]
  async fn violated_threshold_reaches_the_queue() {
    let (sender, mut queue) = mpsc::channel(16);
    let registry = Arc::new(ThresholdRegistry::new());
    let workflow_id = WorkflowId::generate();
    registry.register(TelemetryThreshold::new(
      "org-1",
      workflow_id.clone(),
      "temperature",
      ThresholdComparison::Gt,
      30.0,
      "overheat",
    ));
    let pipeline = IngestionPipeline::new(
      Arc::new(MemoryTelemetryRepository::new()),
      registry,
      sender,
    );

    pipeline.ingest(record(35.0)).await;
    pipeline.ingest(record(25.0)).await;

    let event = queue.try_recv().unwrap();
    assert_eq!(event.workflow_id, workflow_id);
    assert!(queue.try_recv().is_err());
    assert_eq!(pipeline.stats().triggers_fired, 1);
  }

  #[tokio::test]
  async fn feeds_rolling_aggregates() {
    let (pipeline, _queue) = pipeline_with_queue();
    pipeline.ingest(record(10.0)).await;
    pipeline.ingest(record(30.0)).await;

    let snapshot = pipeline
      .aggregates()
      .snapshot("org-1", "sensor-1", "temperature")
      .unwrap();
    assert_eq!(snapshot.count, 2);
    assert_eq!(snapshot.avg, 20.0);
  }

  #[tokio::test]
  async fn run_drains_the_stream() {
    let (pipeline, _queue) = pipeline_with_queue();
    let (sender, receiver) = mpsc::channel(16);

    sender.send(record(20.0)).await.unwrap();
    sender.send(invalid_record()).await.unwrap();
    sender.send(record(22.0)).await.unwrap();
    drop(sender);

    pipeline.run(receiver, CancellationToken::new()).await;

    let stats = pipeline.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.rejected, 1);
  }
}
