use std::collections::HashMap;

use verbena_model::NodeId;

use crate::edge::WorkflowEdge;
use crate::node::WorkflowNode;

/// Adjacency index over a workflow's nodes and edges.
///
/// Edge order within each adjacency list follows edge declaration order in
/// the workflow; routing depends on it.
#[derive(Debug, Clone)]
pub struct Graph {
  /// node_id -> indices into the workflow's edge list, outgoing.
  outgoing: HashMap<NodeId, Vec<usize>>,
  /// Nodes with no incoming edges, in node declaration order.
  entry_points: Vec<NodeId>,
  /// Nodes with no outgoing edges, in node declaration order.
  exit_points: Vec<NodeId>,
}

impl Graph {
  /// Build the index from a workflow's node and edge lists.
  pub fn new(nodes: &[WorkflowNode], edges: &[WorkflowEdge]) -> Self {
    let mut outgoing: HashMap<NodeId, Vec<usize>> = HashMap::new();
    let mut incoming: HashMap<NodeId, Vec<usize>> = HashMap::new();

    for node in nodes {
      outgoing.entry(node.id().clone()).or_default();
      incoming.entry(node.id().clone()).or_default();
    }

    for (idx, edge) in edges.iter().enumerate() {
      outgoing.entry(edge.source().clone()).or_default().push(idx);
      incoming.entry(edge.target().clone()).or_default().push(idx);
    }

    let entry_points: Vec<NodeId> = nodes
      .iter()
      .filter(|n| incoming.get(n.id()).is_none_or(|v| v.is_empty()))
      .map(|n| n.id().clone())
      .collect();

    let exit_points: Vec<NodeId> = nodes
      .iter()
      .filter(|n| outgoing.get(n.id()).is_none_or(|v| v.is_empty()))
      .map(|n| n.id().clone())
      .collect();

    Self {
      outgoing,
      entry_points,
      exit_points,
    }
  }

  /// Nodes with no incoming edges (start nodes).
  pub fn entry_points(&self) -> &[NodeId] {
    &self.entry_points
  }

  /// Nodes with no outgoing edges (end nodes).
  pub fn exit_points(&self) -> &[NodeId] {
    &self.exit_points
  }

  /// Outgoing edge indices for a node, in declaration order.
  pub fn outgoing(&self, node_id: &NodeId) -> &[usize] {
    self
      .outgoing
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}
