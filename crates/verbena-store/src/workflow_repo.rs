use async_trait::async_trait;
use chrono::{DateTime, Utc};
use verbena_model::{NodeId, NodeType, WorkflowId, WorkflowStatus};
use verbena_workflow::Workflow;

use crate::StoreError;
use crate::types::{WorkflowSearchQuery, WorkflowSearchResult, WorkflowStatistics};

/// Persistence port for workflow aggregates.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
  /// Insert or replace a workflow.
  async fn save(&self, workflow: &Workflow) -> Result<(), StoreError>;

  /// Load a workflow by id.
  async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<Workflow>, StoreError>;

  /// Remove a workflow. Returns whether one existed.
  async fn delete(&self, id: &WorkflowId) -> Result<bool, StoreError>;

  async fn exists(&self, id: &WorkflowId) -> Result<bool, StoreError>;

  async fn find_by_organization(&self, organization_id: &str)
  -> Result<Vec<Workflow>, StoreError>;

  async fn find_by_status(&self, status: WorkflowStatus) -> Result<Vec<Workflow>, StoreError>;

  async fn find_by_organization_and_status(
    &self,
    organization_id: &str,
    status: WorkflowStatus,
  ) -> Result<Vec<Workflow>, StoreError>;

  /// Case-insensitive name substring search.
  async fn find_by_name_containing(&self, fragment: &str) -> Result<Vec<Workflow>, StoreError>;

  async fn find_created_between(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<Workflow>, StoreError>;

  async fn find_updated_after(&self, since: DateTime<Utc>) -> Result<Vec<Workflow>, StoreError>;

  /// Workflows containing at least one node of the given type.
  async fn find_by_node_type(&self, node_type: NodeType) -> Result<Vec<Workflow>, StoreError>;

  /// Workflows containing the given node id.
  async fn find_by_node_id(&self, node_id: &NodeId) -> Result<Vec<Workflow>, StoreError>;

  /// Filtered, sorted, paged search.
  async fn search(&self, query: &WorkflowSearchQuery)
  -> Result<WorkflowSearchResult, StoreError>;

  /// Aggregate statistics for one organization.
  async fn statistics(&self, organization_id: &str) -> Result<WorkflowStatistics, StoreError>;
}
