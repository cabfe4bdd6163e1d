//! Verbena Model
//!
//! Shared value types for the Verbena workflow engine. Everything here is a
//! small, serializable building block used across the other crates:
//!
//! - Opaque identifiers (`WorkflowId`, `NodeId`, `EdgeId`, `ExecutionId`,
//!   `DeviceId`, `TelemetryId`)
//! - Geospatial types (`Position`, `GeoLocation`, `BoundingBox`)
//! - The tagged `MetricValue` union carried by telemetry records
//! - Status and type enums for workflows, nodes, edges, and executions
//! - `ValidationResult`, the error/warning report shared by the validators

mod error;
mod geo;
mod id;
mod metric;
mod status;
mod validation;

pub use error::ModelError;
pub use geo::{BoundingBox, GeoLocation, Position};
pub use id::{DeviceId, EdgeId, ExecutionId, NodeId, TelemetryId, WorkflowId};
pub use metric::MetricValue;
pub use status::{EdgeType, ExecutionStatus, NodeType, WorkflowStatus};
pub use validation::ValidationResult;
