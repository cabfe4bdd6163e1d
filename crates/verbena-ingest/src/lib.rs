//! Verbena Ingest
//!
//! The telemetry ingestion pipeline and the analysis surface built on top
//! of the repository port.
//!
//! The pipeline consumes a stream of [`TelemetryData`], applies the quality
//! gate, persists each record, runs it through the threshold bridge, and
//! feeds the rolling aggregates. Per-record errors are isolated: they are
//! logged and counted but never stop the stream.
//!
//! [`Analyzer`] computes per-metric statistics, anomalies, and trends for a
//! query, caching results briefly keyed by the query.
//!
//! [`TelemetryData`]: verbena_telemetry::TelemetryData

mod analysis;
mod error;
mod pipeline;

pub use analysis::{Analyzer, Anomaly, MetricProfile, TelemetryAnalysis, Trend};
pub use error::IngestError;
pub use pipeline::{IngestStats, IngestionPipeline};
