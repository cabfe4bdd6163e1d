use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
  #[error("repository error: {0}")]
  Repository(#[from] verbena_store::StoreError),

  #[error(transparent)]
  Telemetry(#[from] verbena_telemetry::TelemetryError),
}
