//! Verbena Store
//!
//! The repository ports the core consumes, and in-memory implementations
//! of both. All durability is delegated: the core persists nothing itself.
//!
//! - [`WorkflowRepository`]: save/load/search workflows, organization
//!   statistics.
//! - [`TelemetryRepository`]: time-series and spatial writes and reads,
//!   bucketed aggregation, device summaries, retention management.
//!
//! The in-memory implementations back the test suites and small embedded
//! deployments; durable backends implement the same traits.

mod memory_telemetry;
mod memory_workflow;
mod telemetry_repo;
mod types;
mod workflow_repo;

pub use memory_telemetry::MemoryTelemetryRepository;
pub use memory_workflow::MemoryWorkflowRepository;
pub use telemetry_repo::TelemetryRepository;
pub use types::{
  AggregateBucket, DeviceSummary, MetricStatistics, SortOrder, TelemetryPage,
  WorkflowSearchQuery, WorkflowSearchResult, WorkflowSortField, WorkflowStatistics,
};
pub use workflow_repo::WorkflowRepository;

use thiserror::Error;

/// Error type for repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A page token that did not come from a previous result.
  #[error("invalid page token: {0}")]
  InvalidPageToken(String),

  /// A spatial write was attempted for a record without a location.
  #[error("spatial record has no location")]
  MissingLocation,

  /// An error bubbled up from the backing store, wrapped with context.
  #[error("repository error in {context}: {message}")]
  Backend { context: String, message: String },
}
