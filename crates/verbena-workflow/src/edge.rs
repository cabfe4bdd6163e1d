use serde::{Deserialize, Serialize};
use verbena_model::{EdgeId, EdgeType, NodeId};

use crate::error::WorkflowError;

/// A directed edge between two workflow nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEdge {
  id: EdgeId,
  source: NodeId,
  target: NodeId,
  label: String,
  edge_type: EdgeType,
}

impl WorkflowEdge {
  /// Create an edge. Self-loops are rejected.
  pub fn new(
    id: EdgeId,
    source: NodeId,
    target: NodeId,
    label: impl Into<String>,
    edge_type: EdgeType,
  ) -> Result<Self, WorkflowError> {
    if source == target {
      return Err(WorkflowError::SelfLoop(source));
    }
    Ok(Self {
      id,
      source,
      target,
      label: label.into(),
      edge_type,
    })
  }

  pub fn id(&self) -> &EdgeId {
    &self.id
  }

  pub fn source(&self) -> &NodeId {
    &self.source
  }

  pub fn target(&self) -> &NodeId {
    &self.target
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn edge_type(&self) -> EdgeType {
    self.edge_type
  }
}
