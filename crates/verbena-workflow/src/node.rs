use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use verbena_model::{NodeId, NodeType, Position};

/// A single node in a workflow graph.
///
/// The configuration map is free-form; its semantics depend on the node
/// type. Decision and Condition nodes carry their condition tree under the
/// `conditions` key, Task and Action nodes carry their specification under
/// `task` and `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
  id: NodeId,
  node_type: NodeType,
  label: String,
  position: Position,
  #[serde(default)]
  configuration: HashMap<String, serde_json::Value>,
}

impl WorkflowNode {
  pub fn new(id: NodeId, node_type: NodeType, label: impl Into<String>, position: Position) -> Self {
    Self {
      id,
      node_type,
      label: label.into(),
      position,
      configuration: HashMap::new(),
    }
  }

  /// Builder-style helper for attaching a configuration entry.
  pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.configuration.insert(key.into(), value);
    self
  }

  pub fn id(&self) -> &NodeId {
    &self.id
  }

  pub fn node_type(&self) -> NodeType {
    self.node_type
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn position(&self) -> Position {
    self.position
  }

  pub fn configuration(&self) -> &HashMap<String, serde_json::Value> {
    &self.configuration
  }

  pub fn config_value(&self, key: &str) -> Option<&serde_json::Value> {
    self.configuration.get(key)
  }

  /// The condition tree of a Decision/Condition node, if present.
  pub fn conditions(&self) -> Option<&serde_json::Value> {
    self.configuration.get("conditions")
  }

  /// The task specification of a Task node, if present.
  pub fn task_spec(&self) -> Option<&serde_json::Value> {
    self.configuration.get("task")
  }

  /// The action specification of an Action node, if present.
  pub fn action_spec(&self) -> Option<&serde_json::Value> {
    self.configuration.get("action")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn config_accessors() {
    let node = WorkflowNode::new(
      NodeId::new("d1").unwrap(),
      NodeType::Decision,
      "check temperature",
      Position::default(),
    )
    .with_config("conditions", json!({"field": "temperature", "operator": ">", "value": 25}));

    assert!(node.conditions().is_some());
    assert!(node.task_spec().is_none());
    assert!(node.node_type().requires_conditions());
  }
}
