//! Workflow validation.
//!
//! All three entry points are total: they report problems through
//! [`ValidationResult`] and never fail on a syntactically constructed
//! workflow.

use verbena_model::{EdgeType, NodeType, ValidationResult, WorkflowStatus};

use crate::node::WorkflowNode;
use crate::workflow::{Workflow, structural_errors};

/// Validate a workflow's structure.
///
/// Errors mirror the aggregate's construction invariants; warnings flag
/// shapes that are legal but unlikely to be intended.
pub fn validate(workflow: &Workflow) -> ValidationResult {
  let mut result = ValidationResult::new();

  for error in structural_errors(workflow.name(), workflow.nodes(), workflow.edges()) {
    result.add_error(error);
  }

  if !workflow.nodes().is_empty() && workflow.end_nodes().is_empty() {
    result.add_warning("workflow has no end node (every node has an outgoing edge)");
  }

  for node in workflow.nodes() {
    if node.node_type().requires_conditions() && node.conditions().is_none() {
      result.add_warning(format!(
        "{} node '{}' has no conditions configured",
        node.node_type(),
        node.id()
      ));
    }
  }

  result
}

/// Validate a proposed connection between two nodes.
pub fn validate_connection(
  source: &WorkflowNode,
  target: &WorkflowNode,
  edge_type: EdgeType,
) -> ValidationResult {
  let mut result = ValidationResult::new();

  if source.id() == target.id() {
    result.add_error("a node cannot connect to itself");
  }
  if target.node_type() == NodeType::Start {
    result.add_error("start nodes cannot have incoming connections");
  }
  if source.node_type() == NodeType::End {
    result.add_error("end nodes cannot have outgoing connections");
  }
  if source.node_type().requires_conditions() && edge_type == EdgeType::Default {
    result.add_warning(format!(
      "{} node '{}' usually routes through conditional_true/conditional_false edges",
      source.node_type(),
      source.id()
    ));
  }

  result
}

/// Validate that a workflow is ready to be executed.
pub fn validate_execution_readiness(workflow: &Workflow) -> ValidationResult {
  let mut result = ValidationResult::new();

  if workflow.status() != WorkflowStatus::Active {
    result.add_error(format!(
      "workflow is {}, only active workflows can execute",
      workflow.status()
    ));
  }

  for node in workflow.nodes() {
    if node.node_type().requires_conditions() && node.conditions().is_none() {
      result.add_error(format!(
        "{} node '{}' has no conditions",
        node.node_type(),
        node.id()
      ));
    }

    if node.node_type() == NodeType::Decision {
      let has_conditional = workflow.outgoing_edges(node.id()).iter().any(|e| {
        matches!(
          e.edge_type(),
          EdgeType::ConditionalTrue | EdgeType::ConditionalFalse
        )
      });
      if !has_conditional {
        result.add_warning(format!(
          "decision node '{}' has no conditional_true or conditional_false outgoing edge",
          node.id()
        ));
      }
    }
  }

  result
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use verbena_model::{EdgeId, NodeId, Position, WorkflowId};

  use crate::edge::WorkflowEdge;

  fn node(id: &str, node_type: NodeType) -> WorkflowNode {
    WorkflowNode::new(NodeId::new(id).unwrap(), node_type, id, Position::default())
  }

  fn edge(source: &str, target: &str, edge_type: EdgeType) -> WorkflowEdge {
    WorkflowEdge::new(
      EdgeId::generate(),
      NodeId::new(source).unwrap(),
      NodeId::new(target).unwrap(),
      "",
      edge_type,
    )
    .unwrap()
  }

  fn decision_workflow(with_conditions: bool) -> Workflow {
    let mut decision = node("d", NodeType::Decision);
    if with_conditions {
      decision = decision.with_config(
        "conditions",
        json!({"field": "temperature", "operator": ">", "value": 25}),
      );
    }
    Workflow::new(
      WorkflowId::generate(),
      "decision",
      "org-1",
      vec![
        node("start", NodeType::Start),
        decision,
        node("end_a", NodeType::End),
        node("end_b", NodeType::End),
      ],
      vec![
        edge("start", "d", EdgeType::Default),
        edge("d", "end_a", EdgeType::ConditionalTrue),
        edge("d", "end_b", EdgeType::ConditionalFalse),
      ],
    )
    .unwrap()
  }

  #[test]
  fn valid_workflow_passes() {
    let result = validate(&decision_workflow(true));
    assert!(result.valid, "errors: {:?}", result.errors);
  }

  #[test]
  fn missing_conditions_is_a_structure_warning() {
    let result = validate(&decision_workflow(false));
    assert!(result.valid);
    assert!(!result.warnings.is_empty());
  }

  #[test]
  fn connection_rules() {
    let start = node("start", NodeType::Start);
    let end = node("end", NodeType::End);
    let decision = node("d", NodeType::Decision);
    let task = node("t", NodeType::Task);

    let into_start = validate_connection(&task, &start, EdgeType::Default);
    assert!(!into_start.valid);

    let out_of_end = validate_connection(&end, &task, EdgeType::Default);
    assert!(!out_of_end.valid);

    let self_loop = validate_connection(&task, &task, EdgeType::Default);
    assert!(!self_loop.valid);

    let default_from_decision = validate_connection(&decision, &task, EdgeType::Default);
    assert!(default_from_decision.valid);
    assert!(!default_from_decision.warnings.is_empty());
  }

  #[test]
  fn readiness_requires_active_status_and_conditions() {
    let draft = decision_workflow(true);
    let result = validate_execution_readiness(&draft);
    assert!(!result.valid);

    let mut active = decision_workflow(true);
    active.activate().unwrap();
    let result = validate_execution_readiness(&active);
    assert!(result.valid, "errors: {:?}", result.errors);

    let mut missing = decision_workflow(false);
    missing.activate().unwrap();
    let result = validate_execution_readiness(&missing);
    assert!(!result.valid);
    assert!(result.errors.iter().any(|e| e.contains("no conditions")));
  }

  #[test]
  fn readiness_warns_on_unconditional_decision_edges() {
    let mut workflow = Workflow::new(
      WorkflowId::generate(),
      "all-default",
      "org-1",
      vec![
        node("start", NodeType::Start),
        node("d", NodeType::Decision).with_config(
          "conditions",
          json!({"field": "temperature", "operator": ">", "value": 25}),
        ),
        node("end", NodeType::End),
      ],
      vec![
        edge("start", "d", EdgeType::Default),
        edge("d", "end", EdgeType::Default),
      ],
    )
    .unwrap();
    workflow.activate().unwrap();

    let result = validate_execution_readiness(&workflow);
    assert!(result.valid);
    assert!(
      result
        .warnings
        .iter()
        .any(|w| w.contains("conditional_true"))
    );
  }
}
