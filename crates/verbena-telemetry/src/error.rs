use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
  #[error("telemetry record has no metrics")]
  EmptyMetrics,

  #[error("telemetry timestamp {0} is too far in the future")]
  FutureTimestamp(DateTime<Utc>),

  #[error("organization id must not be empty")]
  EmptyOrganization,

  #[error("query time range is inverted: from {from} is after to {to}")]
  InvalidTimeRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  },

  #[error("radius must be positive, got {0}")]
  NonPositiveRadius(f64),

  #[error("limit must be positive, got {0}")]
  NonPositiveLimit(i64),

  #[error("query cannot combine a radius filter with a bounding box")]
  ConflictingSpatialFilters,

  #[error(transparent)]
  Model(#[from] verbena_model::ModelError),
}
