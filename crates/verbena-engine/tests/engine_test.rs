//! Integration tests for the execution engine: end-to-end runs, routing,
//! failure modes, and the command-channel handles.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;
use verbena_engine::{
  ChannelNotifier, EngineConfig, EngineError, ExecutionEvent, WorkflowEngine, WorkflowExecution,
};
use verbena_model::{
  DeviceId, EdgeId, EdgeType, ExecutionStatus, MetricValue, NodeId, NodeType, Position,
  WorkflowId,
};
use verbena_telemetry::TelemetryData;
use verbena_workflow::{Workflow, WorkflowEdge, WorkflowNode};

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

fn active(mut workflow: Workflow) -> Workflow {
  workflow.activate().unwrap();
  workflow
}

/// START -> TASK("t1") -> END, all edges DEFAULT.
fn linear_workflow() -> Workflow {
  active(
    Workflow::new(
      WorkflowId::generate(),
      "linear",
      "org-1",
      vec![
        node("start", NodeType::Start),
        node("t1", NodeType::Task).with_config("task", json!({"name": "t1"})),
        node("end", NodeType::End),
      ],
      vec![
        edge("start", "t1", EdgeType::Default),
        edge("t1", "end", EdgeType::Default),
      ],
    )
    .unwrap(),
  )
}

/// START -> DECISION("d") -> {end_a, end_b} with the given edge types.
fn decision_workflow(
  conditions: Option<serde_json::Value>,
  true_edge: EdgeType,
  false_edge: EdgeType,
) -> Workflow {
  let mut decision = node("d", NodeType::Decision);
  if let Some(conditions) = conditions {
    decision = decision.with_config("conditions", conditions);
  }
  active(
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
        edge("d", "end_a", true_edge),
        edge("d", "end_b", false_edge),
      ],
    )
    .unwrap(),
  )
}

fn temperature_condition() -> serde_json::Value {
  json!({"field": "temperature", "operator": ">", "value": 25})
}

fn record(metric: &str, value: f64) -> TelemetryData {
  TelemetryData::new(
    DeviceId::new("sensor-1").unwrap(),
    "org-1",
    Utc::now(),
    HashMap::from([(metric.to_string(), MetricValue::Numeric(value))]),
    None,
  )
  .unwrap()
}

#[tokio::test]
async fn linear_workflow_completes() {
  let engine = WorkflowEngine::new();
  let workflow = linear_workflow();

  let execution = engine.execute(&workflow, None).await;

  assert_eq!(execution.status(), ExecutionStatus::Completed);
  assert_eq!(execution.current_node_id().unwrap().as_str(), "end");
  assert_eq!(
    execution.context_value("task_result").unwrap(),
    &json!({"name": "t1"})
  );
  let visited: Vec<&str> = execution.trace().iter().map(|n| n.as_str()).collect();
  assert_eq!(visited, vec!["start", "t1", "end"]);
  assert!(execution.completed_at().is_some());
}

#[tokio::test]
async fn decision_routes_true_branch() {
  let engine = WorkflowEngine::new();
  let workflow = decision_workflow(
    Some(temperature_condition()),
    EdgeType::ConditionalTrue,
    EdgeType::ConditionalFalse,
  );
  let trigger = record("temperature", 27.5);

  let execution = engine.execute(&workflow, Some(&trigger)).await;

  assert_eq!(execution.status(), ExecutionStatus::Completed);
  assert_eq!(execution.current_node_id().unwrap().as_str(), "end_a");
  assert_eq!(
    execution.context_value("condition_result_d").unwrap(),
    &json!(true)
  );
  assert!(execution.context_value("condition_evaluation_time").is_some());
  let routing = execution
    .context_value("routing_decision")
    .and_then(|v| v.as_str())
    .unwrap();
  assert!(routing.starts_with("Condition TRUE -> Node end_a"), "{routing}");
}

#[tokio::test]
async fn decision_routes_false_branch() {
  let engine = WorkflowEngine::new();
  let workflow = decision_workflow(
    Some(temperature_condition()),
    EdgeType::ConditionalTrue,
    EdgeType::ConditionalFalse,
  );
  let trigger = record("temperature", 10.0);

  let execution = engine.execute(&workflow, Some(&trigger)).await;

  assert_eq!(execution.status(), ExecutionStatus::Completed);
  assert_eq!(execution.current_node_id().unwrap().as_str(), "end_b");
  assert_eq!(
    execution.context_value("condition_result_d").unwrap(),
    &json!(false)
  );
}

#[tokio::test]
async fn decision_falls_back_to_first_declared_edge() {
  // Both outgoing edges are DEFAULT: no type matches the false result, so
  // routing falls back to the first declared edge.
  let engine = WorkflowEngine::new();
  let workflow = decision_workflow(
    Some(temperature_condition()),
    EdgeType::Default,
    EdgeType::Default,
  );
  let trigger = record("temperature", 10.0);

  let execution = engine.execute(&workflow, Some(&trigger)).await;

  assert_eq!(execution.status(), ExecutionStatus::Completed);
  assert_eq!(execution.current_node_id().unwrap().as_str(), "end_a");
  assert_eq!(
    execution.context_value("condition_result_d").unwrap(),
    &json!(false)
  );
}

#[tokio::test]
async fn decision_without_conditions_fails() {
  let engine = WorkflowEngine::new();
  let workflow = decision_workflow(None, EdgeType::ConditionalTrue, EdgeType::ConditionalFalse);

  let execution = engine.execute(&workflow, Some(&record("temperature", 30.0))).await;

  assert_eq!(execution.status(), ExecutionStatus::Failed);
  assert!(execution.error_message().unwrap().contains("no conditions"));
}

#[tokio::test]
async fn unknown_metric_routes_false() {
  let engine = WorkflowEngine::new();
  let workflow = decision_workflow(
    Some(json!({"field": "humidity", "operator": ">", "value": 50})),
    EdgeType::ConditionalTrue,
    EdgeType::ConditionalFalse,
  );
  let trigger = record("temperature", 30.0);

  let execution = engine.execute(&workflow, Some(&trigger)).await;

  assert_eq!(execution.status(), ExecutionStatus::Completed);
  assert_eq!(execution.current_node_id().unwrap().as_str(), "end_b");
}

#[tokio::test]
async fn condition_error_carries_node_id() {
  let engine = WorkflowEngine::new();
  let workflow = decision_workflow(
    Some(json!({"operator": "xor", "conditions": [temperature_condition()]})),
    EdgeType::ConditionalTrue,
    EdgeType::ConditionalFalse,
  );

  let execution = engine.execute(&workflow, Some(&record("temperature", 30.0))).await;

  assert_eq!(execution.status(), ExecutionStatus::Failed);
  let message = execution.error_message().unwrap();
  assert!(message.starts_with("d:"), "{message}");
}

#[tokio::test]
async fn inactive_workflow_fails_immediately() {
  let engine = WorkflowEngine::new();
  let workflow = Workflow::new(
    WorkflowId::generate(),
    "draft",
    "org-1",
    vec![node("start", NodeType::Start)],
    vec![],
  )
  .unwrap();

  let execution = engine.execute(&workflow, None).await;

  assert_eq!(execution.status(), ExecutionStatus::Failed);
  assert_eq!(execution.error_message(), Some("workflow not active"));
  assert!(execution.trace().is_empty());
}

#[tokio::test]
async fn cyclic_workflow_hits_the_step_limit() {
  let engine = WorkflowEngine::with_config(EngineConfig {
    max_node_steps: 50,
    ..EngineConfig::default()
  });
  let workflow = active(
    Workflow::new(
      WorkflowId::generate(),
      "cycle",
      "org-1",
      vec![
        node("start", NodeType::Start),
        node("a", NodeType::Task),
        node("b", NodeType::Task),
      ],
      vec![
        edge("start", "a", EdgeType::Default),
        edge("a", "b", EdgeType::Default),
        edge("b", "a", EdgeType::Default),
      ],
    )
    .unwrap(),
  );

  let execution = engine.execute(&workflow, None).await;

  assert_eq!(execution.status(), ExecutionStatus::Failed);
  assert_eq!(execution.error_message(), Some("step limit exceeded"));
  assert_eq!(execution.steps(), 50);
}

#[tokio::test]
async fn action_node_records_result() {
  let engine = WorkflowEngine::new();
  let workflow = active(
    Workflow::new(
      WorkflowId::generate(),
      "action",
      "org-1",
      vec![
        node("start", NodeType::Start),
        node("notify", NodeType::Action).with_config("action", json!("page-oncall")),
        node("end", NodeType::End),
      ],
      vec![
        edge("start", "notify", EdgeType::Default),
        edge("notify", "end", EdgeType::Default),
      ],
    )
    .unwrap(),
  );

  let execution = engine.execute(&workflow, None).await;

  assert_eq!(execution.status(), ExecutionStatus::Completed);
  assert_eq!(
    execution.context_value("action_result").unwrap(),
    &json!("page-oncall")
  );
}

#[tokio::test]
async fn emits_node_events_in_visit_order() {
  let (sender, mut events) = tokio::sync::mpsc::unbounded_channel();
  let engine = WorkflowEngine::with_notifier(EngineConfig::default(), ChannelNotifier::new(sender));
  let workflow = linear_workflow();

  let execution = engine.execute(&workflow, None).await;
  assert_eq!(execution.status(), ExecutionStatus::Completed);

  let mut entered = Vec::new();
  let mut completed = Vec::new();
  while let Ok(event) = events.try_recv() {
    match event {
      ExecutionEvent::NodeEntered { node_id, .. } => entered.push(node_id),
      ExecutionEvent::NodeCompleted { node_id, .. } => completed.push(node_id),
      _ => {}
    }
  }

  let entered: Vec<&str> = entered.iter().map(|n| n.as_str()).collect();
  let completed: Vec<&str> = completed.iter().map(|n| n.as_str()).collect();
  assert_eq!(entered, vec!["start", "t1", "end"]);
  assert_eq!(completed, vec!["start", "t1", "end"]);
}

#[tokio::test]
async fn failed_node_emits_no_completion_event() {
  let (sender, mut events) = tokio::sync::mpsc::unbounded_channel();
  let engine = WorkflowEngine::with_notifier(EngineConfig::default(), ChannelNotifier::new(sender));
  let workflow = decision_workflow(None, EdgeType::ConditionalTrue, EdgeType::ConditionalFalse);

  let execution = engine.execute(&workflow, Some(&record("temperature", 30.0))).await;
  assert_eq!(execution.status(), ExecutionStatus::Failed);

  let mut completed = Vec::new();
  while let Ok(event) = events.try_recv() {
    if let ExecutionEvent::NodeCompleted { node_id, .. } = event {
      completed.push(node_id);
    }
  }

  // The start node completed; the conditionless decision did not.
  let completed: Vec<&str> = completed.iter().map(|n| n.as_str()).collect();
  assert_eq!(completed, vec!["start"]);
}

#[tokio::test]
async fn manual_stepping_walks_one_node_at_a_time() {
  let engine = WorkflowEngine::new();
  let workflow = linear_workflow();
  let mut execution =
    WorkflowExecution::new(workflow.id().clone(), workflow.organization_id(), None);

  engine.execute_step(&workflow, &mut execution, None).await.unwrap();
  assert_eq!(execution.current_node_id().unwrap().as_str(), "t1");
  assert_eq!(execution.status(), ExecutionStatus::Running);

  engine.execute_step(&workflow, &mut execution, None).await.unwrap();
  assert_eq!(execution.current_node_id().unwrap().as_str(), "end");

  engine.execute_step(&workflow, &mut execution, None).await.unwrap();
  assert_eq!(execution.status(), ExecutionStatus::Completed);

  let err = engine.execute_step(&workflow, &mut execution, None).await.unwrap_err();
  assert!(matches!(err, EngineError::ExecutionFinished(_)));
}

#[tokio::test]
async fn stepping_a_paused_execution_is_rejected() {
  let engine = WorkflowEngine::new();
  let workflow = linear_workflow();
  let mut execution =
    WorkflowExecution::new(workflow.id().clone(), workflow.organization_id(), None);

  execution.pause().unwrap();
  assert!(!engine.can_continue(&workflow, &execution));

  let err = engine.execute_step(&workflow, &mut execution, None).await.unwrap_err();
  assert!(matches!(err, EngineError::NotRunning(_)));
}

#[tokio::test]
async fn predicts_next_nodes() {
  let engine = WorkflowEngine::new();
  let workflow = decision_workflow(
    Some(temperature_condition()),
    EdgeType::ConditionalTrue,
    EdgeType::ConditionalFalse,
  );
  let decision = NodeId::new("d").unwrap();

  // With data: the single routed successor.
  let hot = record("temperature", 30.0);
  let predicted = engine.possible_next_nodes(&workflow, &decision, Some(&hot));
  assert_eq!(predicted.len(), 1);
  assert_eq!(predicted[0].id().as_str(), "end_a");

  let cold = record("temperature", 10.0);
  let predicted = engine.possible_next_nodes(&workflow, &decision, Some(&cold));
  assert_eq!(predicted.len(), 1);
  assert_eq!(predicted[0].id().as_str(), "end_b");

  // Without data: every successor, in edge order.
  let all = engine.possible_next_nodes(&workflow, &decision, None);
  let ids: Vec<&str> = all.iter().map(|n| n.id().as_str()).collect();
  assert_eq!(ids, vec!["end_a", "end_b"]);

  // Non-decision nodes always list their successors.
  let start = NodeId::new("start").unwrap();
  let next = engine.possible_next_nodes(&workflow, &start, Some(&hot));
  assert_eq!(next.len(), 1);
  assert_eq!(next[0].id().as_str(), "d");
}
