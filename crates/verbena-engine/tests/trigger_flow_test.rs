//! End-to-end flow: telemetry ingestion fires a threshold, the trigger
//! event reaches the runner, and the workflow executes against the
//! triggering record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use verbena_engine::{
  ChannelNotifier, EngineConfig, EngineRunner, ExecutionEvent, WorkflowEngine,
};
use verbena_ingest::IngestionPipeline;
use verbena_model::{
  DeviceId, EdgeId, EdgeType, MetricValue, NodeId, NodeType, Position, WorkflowId,
};
use verbena_store::{
  MemoryTelemetryRepository, MemoryWorkflowRepository, TelemetryRepository, WorkflowRepository,
};
use verbena_telemetry::{
  TelemetryData, TelemetryThreshold, ThresholdComparison, ThresholdRegistry,
};
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

/// A workflow that branches on the triggering record's temperature.
fn overheat_workflow() -> Workflow {
  let mut workflow = Workflow::new(
    WorkflowId::generate(),
    "overheat response",
    "org-1",
    vec![
      node("start", NodeType::Start),
      node("check", NodeType::Decision).with_config(
        "conditions",
        json!({"field": "temperature", "operator": ">", "value": 30}),
      ),
      node("alert", NodeType::Action).with_config("action", json!("page-oncall")),
      node("log_only", NodeType::End),
      node("end", NodeType::End),
    ],
    vec![
      edge("start", "check", EdgeType::Default),
      edge("check", "alert", EdgeType::ConditionalTrue),
      edge("check", "log_only", EdgeType::ConditionalFalse),
      edge("alert", "end", EdgeType::Default),
    ],
  )
  .unwrap();
  workflow.activate().unwrap();
  workflow
}

fn hot_record() -> TelemetryData {
  TelemetryData::new(
    DeviceId::new("sensor-1").unwrap(),
    "org-1",
    Utc::now(),
    HashMap::from([("temperature".to_string(), MetricValue::Numeric(35.0))]),
    None,
  )
  .unwrap()
}

#[tokio::test]
async fn threshold_violation_executes_the_workflow() {
  // Engine with an event channel so the test can observe completion.
  let (event_tx, mut events) = mpsc::unbounded_channel();
  let engine = Arc::new(WorkflowEngine::with_notifier(
    EngineConfig::default(),
    ChannelNotifier::new(event_tx),
  ));

  // The workflow the threshold points at.
  let workflows = Arc::new(MemoryWorkflowRepository::new());
  let workflow = overheat_workflow();
  let workflow_id = workflow.id().clone();
  workflows.save(&workflow).await.unwrap();

  // Threshold registry and ingestion pipeline feeding the runner's queue.
  let registry = Arc::new(ThresholdRegistry::new());
  registry.register(TelemetryThreshold::new(
    "org-1",
    workflow_id.clone(),
    "temperature",
    ThresholdComparison::Gt,
    30.0,
    "overheat",
  ));

  let runner = EngineRunner::new(engine.clone(), workflows.clone());
  let triggers = runner.sender();
  let cancel = CancellationToken::new();
  let runner_task = tokio::spawn(runner.start(cancel.clone()));

  let telemetry = Arc::new(MemoryTelemetryRepository::new());
  let pipeline = IngestionPipeline::new(telemetry.clone(), registry, triggers);

  // Ingest one hot record: persisted, threshold fires, workflow runs.
  assert!(pipeline.ingest(hot_record()).await);
  assert_eq!(pipeline.stats().triggers_fired, 1);
  assert_eq!(telemetry.count("org-1").await.unwrap(), 1);

  let mut condition_result = None;
  let completed = tokio::time::timeout(Duration::from_secs(5), async {
    loop {
      match events.recv().await {
        Some(ExecutionEvent::ConditionEvaluated { result, .. }) => {
          condition_result = Some(result);
        }
        Some(ExecutionEvent::ExecutionCompleted { execution_id }) => break execution_id,
        Some(_) => continue,
        None => panic!("event channel closed before completion"),
      }
    }
  })
  .await
  .expect("triggered execution should complete");

  // The record's 35.0 beat the decision's threshold of 30.
  assert_eq!(condition_result, Some(true));
  assert!(!completed.as_str().is_empty());

  cancel.cancel();
  runner_task.await.unwrap();
}

#[tokio::test]
async fn cold_record_fires_nothing() {
  let engine = Arc::new(WorkflowEngine::new());
  let workflows = Arc::new(MemoryWorkflowRepository::new());
  let workflow = overheat_workflow();
  workflows.save(&workflow).await.unwrap();

  let registry = Arc::new(ThresholdRegistry::new());
  registry.register(TelemetryThreshold::new(
    "org-1",
    workflow.id().clone(),
    "temperature",
    ThresholdComparison::Gt,
    30.0,
    "overheat",
  ));

  let runner = EngineRunner::new(engine, workflows);
  let pipeline = IngestionPipeline::new(
    Arc::new(MemoryTelemetryRepository::new()),
    registry,
    runner.sender(),
  );

  let cold = TelemetryData::new(
    DeviceId::new("sensor-1").unwrap(),
    "org-1",
    Utc::now(),
    HashMap::from([("temperature".to_string(), MetricValue::Numeric(20.0))]),
    None,
  )
  .unwrap();

  assert!(pipeline.ingest(cold).await);
  assert_eq!(pipeline.stats().triggers_fired, 0);
}

#[tokio::test]
async fn unknown_workflow_trigger_is_skipped() {
  let engine = Arc::new(WorkflowEngine::new());
  let workflows = Arc::new(MemoryWorkflowRepository::new());

  let registry = Arc::new(ThresholdRegistry::new());
  registry.register(TelemetryThreshold::new(
    "org-1",
    WorkflowId::generate(),
    "temperature",
    ThresholdComparison::Gt,
    30.0,
    "dangling threshold",
  ));

  let runner = EngineRunner::new(engine, workflows);
  let triggers = runner.sender();
  let cancel = CancellationToken::new();
  let runner_task = tokio::spawn(runner.start(cancel.clone()));

  let pipeline = IngestionPipeline::new(
    Arc::new(MemoryTelemetryRepository::new()),
    registry,
    triggers,
  );

  // The trigger fires but the runner drops it; nothing hangs or panics.
  assert!(pipeline.ingest(hot_record()).await);
  assert_eq!(pipeline.stats().triggers_fired, 1);

  tokio::time::sleep(Duration::from_millis(50)).await;
  cancel.cancel();
  runner_task.await.unwrap();
}
