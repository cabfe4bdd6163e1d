//! Verbena Telemetry
//!
//! The telemetry side of the engine:
//!
//! - [`TelemetryData`], the immutable sensor record conditions fire against
//! - [`TelemetryQuery`], the validated query value with time, device,
//!   metric, and spatial filters
//! - [`TelemetryThreshold`] and [`ThresholdRegistry`], which map incoming
//!   records to [`WorkflowTriggerEvent`]s
//! - [`RollingAggregates`], short sliding-window aggregates per
//!   (organization, device, metric)

mod bridge;
mod data;
mod error;
mod query;
mod rolling;
mod threshold;

pub use bridge::ThresholdRegistry;
pub use data::TelemetryData;
pub use error::TelemetryError;
pub use query::{AggregationType, SpatialFilter, TelemetryQuery, TelemetryQueryBuilder};
pub use rolling::{RollingAggregates, WindowSnapshot};
pub use threshold::{TelemetryThreshold, ThresholdComparison, WorkflowTriggerEvent};

/// Maximum allowed clock skew into the future for a record's timestamp.
pub const MAX_FUTURE_SKEW_SECONDS: i64 = 60;
