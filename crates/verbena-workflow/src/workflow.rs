use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verbena_model::{NodeId, WorkflowId, WorkflowStatus};

use crate::edge::WorkflowEdge;
use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::node::WorkflowNode;

/// A workflow aggregate: a named, organization-scoped graph of nodes and
/// edges with a lifecycle status.
///
/// The aggregate exclusively owns its nodes and edges. Node and edge order
/// is preserved exactly as declared; routing relies on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  id: WorkflowId,
  name: String,
  organization_id: String,
  nodes: Vec<WorkflowNode>,
  edges: Vec<WorkflowEdge>,
  status: WorkflowStatus,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl Workflow {
  /// Create a workflow, checking the structural invariants.
  pub fn new(
    id: WorkflowId,
    name: impl Into<String>,
    organization_id: impl Into<String>,
    nodes: Vec<WorkflowNode>,
    edges: Vec<WorkflowEdge>,
  ) -> Result<Self, WorkflowError> {
    let name = name.into();
    let errors = structural_errors(&name, &nodes, &edges);
    if !errors.is_empty() {
      return Err(WorkflowError::Invalid { errors });
    }

    let now = Utc::now();
    Ok(Self {
      id,
      name,
      organization_id: organization_id.into(),
      nodes,
      edges,
      status: WorkflowStatus::Draft,
      created_at: now,
      updated_at: now,
    })
  }

  pub fn id(&self) -> &WorkflowId {
    &self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn organization_id(&self) -> &str {
    &self.organization_id
  }

  pub fn nodes(&self) -> &[WorkflowNode] {
    &self.nodes
  }

  pub fn edges(&self) -> &[WorkflowEdge] {
    &self.edges
  }

  pub fn status(&self) -> WorkflowStatus {
    self.status
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  pub fn updated_at(&self) -> DateTime<Utc> {
    self.updated_at
  }

  /// Replace name, nodes, and edges atomically. The invariants are
  /// re-checked against the new contents before anything is applied, and
  /// `updated_at` moves forward.
  pub fn update_structure(
    &mut self,
    name: impl Into<String>,
    nodes: Vec<WorkflowNode>,
    edges: Vec<WorkflowEdge>,
  ) -> Result<(), WorkflowError> {
    let name = name.into();
    let errors = structural_errors(&name, &nodes, &edges);
    if !errors.is_empty() {
      return Err(WorkflowError::Invalid { errors });
    }

    self.name = name;
    self.nodes = nodes;
    self.edges = edges;
    self.touch();
    Ok(())
  }

  /// Build the adjacency index for the current structure.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.nodes, &self.edges)
  }

  /// Nodes with no incoming edge, in declaration order.
  pub fn start_nodes(&self) -> Vec<&WorkflowNode> {
    let graph = self.graph();
    graph
      .entry_points()
      .iter()
      .filter_map(|id| self.find_node(id))
      .collect()
  }

  /// Nodes with no outgoing edge, in declaration order.
  pub fn end_nodes(&self) -> Vec<&WorkflowNode> {
    let graph = self.graph();
    graph
      .exit_points()
      .iter()
      .filter_map(|id| self.find_node(id))
      .collect()
  }

  pub fn find_node(&self, node_id: &NodeId) -> Option<&WorkflowNode> {
    self.nodes.iter().find(|n| n.id() == node_id)
  }

  /// Outgoing edges of a node, in edge declaration order.
  pub fn outgoing_edges(&self, node_id: &NodeId) -> Vec<&WorkflowEdge> {
    let graph = self.graph();
    graph
      .outgoing(node_id)
      .iter()
      .map(|&idx| &self.edges[idx])
      .collect()
  }

  /// Successor nodes of a node, in edge declaration order.
  pub fn next_nodes(&self, node_id: &NodeId) -> Vec<&WorkflowNode> {
    self
      .outgoing_edges(node_id)
      .into_iter()
      .filter_map(|e| self.find_node(e.target()))
      .collect()
  }

  /// Move the workflow to a new lifecycle status. Activation re-checks the
  /// structural invariants.
  pub fn transition_to(&mut self, to: WorkflowStatus) -> Result<(), WorkflowError> {
    if !self.status.can_transition_to(to) {
      return Err(WorkflowError::InvalidTransition {
        from: self.status,
        to,
      });
    }
    if to == WorkflowStatus::Active {
      let errors = structural_errors(&self.name, &self.nodes, &self.edges);
      if !errors.is_empty() {
        return Err(WorkflowError::Invalid { errors });
      }
    }
    self.status = to;
    self.touch();
    Ok(())
  }

  pub fn activate(&mut self) -> Result<(), WorkflowError> {
    self.transition_to(WorkflowStatus::Active)
  }

  pub fn pause(&mut self) -> Result<(), WorkflowError> {
    self.transition_to(WorkflowStatus::Paused)
  }

  pub fn resume(&mut self) -> Result<(), WorkflowError> {
    self.transition_to(WorkflowStatus::Active)
  }

  pub fn complete(&mut self) -> Result<(), WorkflowError> {
    self.transition_to(WorkflowStatus::Completed)
  }

  pub fn archive(&mut self) -> Result<(), WorkflowError> {
    self.transition_to(WorkflowStatus::Archived)
  }

  /// Advance `updated_at`, keeping it monotonic within the aggregate.
  fn touch(&mut self) {
    self.updated_at = Utc::now().max(self.updated_at);
  }
}

/// The structural invariant checks, shared by construction, mutation,
/// activation, and the validator.
pub(crate) fn structural_errors(
  name: &str,
  nodes: &[WorkflowNode],
  edges: &[WorkflowEdge],
) -> Vec<String> {
  let mut errors = Vec::new();

  if name.trim().is_empty() {
    errors.push("workflow name must not be empty".to_string());
  }
  if nodes.is_empty() {
    errors.push("workflow must contain at least one node".to_string());
  }

  for edge in edges {
    if nodes.iter().all(|n| n.id() != edge.source()) {
      errors.push(format!(
        "edge '{}' references unknown source node '{}'",
        edge.id(),
        edge.source()
      ));
    }
    if nodes.iter().all(|n| n.id() != edge.target()) {
      errors.push(format!(
        "edge '{}' references unknown target node '{}'",
        edge.id(),
        edge.target()
      ));
    }
    if edge.source() == edge.target() {
      errors.push(format!("edge '{}' is a self-loop", edge.id()));
    }
  }

  // A start node is one with no incoming edge.
  if !nodes.is_empty() {
    let has_start = nodes
      .iter()
      .any(|n| edges.iter().all(|e| e.target() != n.id()));
    if !has_start {
      errors.push("workflow has no start node (every node has an incoming edge)".to_string());
    }
  }

  errors
}
