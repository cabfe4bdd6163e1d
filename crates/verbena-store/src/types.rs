use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verbena_model::{DeviceId, WorkflowStatus};
use verbena_telemetry::{AggregationType, TelemetryData};
use verbena_workflow::Workflow;

/// Sort key for workflow searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowSortField {
  Name,
  CreatedAt,
  UpdatedAt,
  Status,
  NodeCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
  Asc,
  Desc,
}

/// A workflow search request with filtering, sorting, and paging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSearchQuery {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub organization_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name_contains: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub statuses: Vec<WorkflowStatus>,
  pub sort_by: WorkflowSortField,
  pub sort_order: SortOrder,
  pub offset: usize,
  pub limit: usize,
}

impl Default for WorkflowSearchQuery {
  fn default() -> Self {
    Self {
      organization_id: None,
      name_contains: None,
      statuses: Vec::new(),
      sort_by: WorkflowSortField::CreatedAt,
      sort_order: SortOrder::Desc,
      offset: 0,
      limit: 50,
    }
  }
}

/// One page of workflow search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSearchResult {
  pub workflows: Vec<Workflow>,
  pub total_count: usize,
  pub offset: usize,
  pub limit: usize,
}

/// Aggregate numbers for one organization's workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatistics {
  pub total: usize,
  pub active: usize,
  pub completed: usize,
  pub draft: usize,
  pub avg_nodes: f64,
  pub avg_edges: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_created: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_updated: Option<DateTime<Utc>>,
}

/// One page of telemetry query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryPage {
  pub data: Vec<TelemetryData>,
  pub total_count: usize,
  pub has_more: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next_page_token: Option<String>,
}

/// One time bucket of an aggregation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBucket {
  pub timestamp: DateTime<Utc>,
  pub metric: String,
  pub value: f64,
  pub count: usize,
  pub aggregation: AggregationType,
}

/// Summary statistics for one metric of one device.
///
/// All statistics are 0.0 when `count` is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
  pub metric: String,
  pub count: usize,
  pub min: f64,
  pub max: f64,
  pub avg: f64,
  pub std_dev: f64,
}

/// Per-device activity summary for an organization and time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
  pub device_id: DeviceId,
  pub record_count: usize,
  pub first_seen: DateTime<Utc>,
  pub last_seen: DateTime<Utc>,
  /// Metric names observed for the device, sorted.
  pub metrics: Vec<String>,
}
