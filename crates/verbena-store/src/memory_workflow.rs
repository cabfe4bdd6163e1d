//! In-memory workflow repository.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use verbena_model::{NodeId, NodeType, WorkflowId, WorkflowStatus};
use verbena_workflow::Workflow;

use crate::StoreError;
use crate::types::{
  SortOrder, WorkflowSearchQuery, WorkflowSearchResult, WorkflowSortField, WorkflowStatistics,
};
use crate::workflow_repo::WorkflowRepository;

/// Map-backed [`WorkflowRepository`] for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryWorkflowRepository {
  workflows: RwLock<HashMap<WorkflowId, Workflow>>,
}

impl MemoryWorkflowRepository {
  pub fn new() -> Self {
    Self {
      workflows: RwLock::new(HashMap::new()),
    }
  }

  fn filtered<F>(&self, predicate: F) -> Vec<Workflow>
  where
    F: Fn(&Workflow) -> bool,
  {
    let workflows = self.workflows.read().unwrap_or_else(|e| e.into_inner());
    let mut matched: Vec<Workflow> = workflows.values().filter(|w| predicate(w)).cloned().collect();
    // Map iteration order is arbitrary; keep results stable.
    matched.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then_with(|| a.id().cmp(b.id())));
    matched
  }
}

fn status_rank(status: WorkflowStatus) -> u8 {
  match status {
    WorkflowStatus::Draft => 0,
    WorkflowStatus::Active => 1,
    WorkflowStatus::Paused => 2,
    WorkflowStatus::Completed => 3,
    WorkflowStatus::Failed => 4,
    WorkflowStatus::Archived => 5,
  }
}

#[async_trait]
impl WorkflowRepository for MemoryWorkflowRepository {
  async fn save(&self, workflow: &Workflow) -> Result<(), StoreError> {
    let mut workflows = self.workflows.write().unwrap_or_else(|e| e.into_inner());
    workflows.insert(workflow.id().clone(), workflow.clone());
    Ok(())
  }

  async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<Workflow>, StoreError> {
    let workflows = self.workflows.read().unwrap_or_else(|e| e.into_inner());
    Ok(workflows.get(id).cloned())
  }

  async fn delete(&self, id: &WorkflowId) -> Result<bool, StoreError> {
    let mut workflows = self.workflows.write().unwrap_or_else(|e| e.into_inner());
    Ok(workflows.remove(id).is_some())
  }

  async fn exists(&self, id: &WorkflowId) -> Result<bool, StoreError> {
    let workflows = self.workflows.read().unwrap_or_else(|e| e.into_inner());
    Ok(workflows.contains_key(id))
  }

  async fn find_by_organization(
    &self,
    organization_id: &str,
  ) -> Result<Vec<Workflow>, StoreError> {
    Ok(self.filtered(|w| w.organization_id() == organization_id))
  }

  async fn find_by_status(&self, status: WorkflowStatus) -> Result<Vec<Workflow>, StoreError> {
    Ok(self.filtered(|w| w.status() == status))
  }

  async fn find_by_organization_and_status(
    &self,
    organization_id: &str,
    status: WorkflowStatus,
  ) -> Result<Vec<Workflow>, StoreError> {
    Ok(self.filtered(|w| w.organization_id() == organization_id && w.status() == status))
  }

  async fn find_by_name_containing(&self, fragment: &str) -> Result<Vec<Workflow>, StoreError> {
    let fragment = fragment.to_lowercase();
    Ok(self.filtered(|w| w.name().to_lowercase().contains(&fragment)))
  }

  async fn find_created_between(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<Workflow>, StoreError> {
    Ok(self.filtered(|w| w.created_at() >= from && w.created_at() <= to))
  }

  async fn find_updated_after(&self, since: DateTime<Utc>) -> Result<Vec<Workflow>, StoreError> {
    Ok(self.filtered(|w| w.updated_at() > since))
  }

  async fn find_by_node_type(&self, node_type: NodeType) -> Result<Vec<Workflow>, StoreError> {
    Ok(self.filtered(|w| w.nodes().iter().any(|n| n.node_type() == node_type)))
  }

  async fn find_by_node_id(&self, node_id: &NodeId) -> Result<Vec<Workflow>, StoreError> {
    Ok(self.filtered(|w| w.find_node(node_id).is_some()))
  }

  async fn search(
    &self,
    query: &WorkflowSearchQuery,
  ) -> Result<WorkflowSearchResult, StoreError> {
    let name_contains = query.name_contains.as_deref().map(str::to_lowercase);
    let mut matched = self.filtered(|w| {
      if let Some(org) = &query.organization_id
        && w.organization_id() != org
      {
        return false;
      }
      if let Some(fragment) = &name_contains
        && !w.name().to_lowercase().contains(fragment)
      {
        return false;
      }
      if !query.statuses.is_empty() && !query.statuses.contains(&w.status()) {
        return false;
      }
      true
    });

    matched.sort_by(|a, b| {
      let ordering = match query.sort_by {
        WorkflowSortField::Name => a.name().cmp(b.name()),
        WorkflowSortField::CreatedAt => a.created_at().cmp(&b.created_at()),
        WorkflowSortField::UpdatedAt => a.updated_at().cmp(&b.updated_at()),
        WorkflowSortField::Status => status_rank(a.status()).cmp(&status_rank(b.status())),
        WorkflowSortField::NodeCount => a.nodes().len().cmp(&b.nodes().len()),
      };
      match query.sort_order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
      }
    });

    let total_count = matched.len();
    let workflows: Vec<Workflow> = matched
      .into_iter()
      .skip(query.offset)
      .take(query.limit)
      .collect();

    Ok(WorkflowSearchResult {
      workflows,
      total_count,
      offset: query.offset,
      limit: query.limit,
    })
  }

  async fn statistics(&self, organization_id: &str) -> Result<WorkflowStatistics, StoreError> {
    let workflows = self.filtered(|w| w.organization_id() == organization_id);
    let total = workflows.len();
    let count_with = |status: WorkflowStatus| {
      workflows.iter().filter(|w| w.status() == status).count()
    };

    let (avg_nodes, avg_edges) = if total == 0 {
      (0.0, 0.0)
    } else {
      let nodes: usize = workflows.iter().map(|w| w.nodes().len()).sum();
      let edges: usize = workflows.iter().map(|w| w.edges().len()).sum();
      (nodes as f64 / total as f64, edges as f64 / total as f64)
    };

    Ok(WorkflowStatistics {
      total,
      active: count_with(WorkflowStatus::Active),
      completed: count_with(WorkflowStatus::Completed),
      draft: count_with(WorkflowStatus::Draft),
      avg_nodes,
      avg_edges,
      last_created: workflows.iter().map(|w| w.created_at()).max(),
      last_updated: workflows.iter().map(|w| w.updated_at()).max(),
    })
  }
}
