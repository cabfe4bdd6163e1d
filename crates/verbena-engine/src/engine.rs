//! The workflow execution engine.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use verbena_model::{EdgeType, ExecutionId, ExecutionStatus, NodeId, NodeType, WorkflowStatus};
use verbena_telemetry::TelemetryData;
use verbena_workflow::{Workflow, WorkflowEdge, WorkflowNode};

use crate::error::EngineError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::execution::WorkflowExecution;

/// Upper bound on node steps per execution; exceeding it fails the
/// execution rather than looping forever.
pub const MAX_NODE_STEPS: u32 = 10_000;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Deadline for a single node step.
  pub step_timeout: Duration,
  /// Node-step cap per execution.
  pub max_node_steps: u32,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      step_timeout: Duration::from_secs(5),
      max_node_steps: MAX_NODE_STEPS,
    }
  }
}

/// Drives workflow executions: one engine instance serves many concurrent
/// executions.
///
/// The engine never owns an execution across calls; callers either hold
/// the [`WorkflowExecution`] themselves and step it, or hand it to a
/// spawned driver task via [`WorkflowEngine::spawn`]. Each `&mut` borrow
/// guarantees one worker advances an execution at a time.
pub struct WorkflowEngine<N: ExecutionNotifier = NoopNotifier> {
  config: EngineConfig,
  notifier: N,
  cancellations: Mutex<HashMap<ExecutionId, CancellationToken>>,
}

impl WorkflowEngine<NoopNotifier> {
  pub fn new() -> Self {
    Self::with_config(EngineConfig::default())
  }

  pub fn with_config(config: EngineConfig) -> Self {
    Self::with_notifier(config, NoopNotifier)
  }
}

impl Default for WorkflowEngine<NoopNotifier> {
  fn default() -> Self {
    Self::new()
  }
}

impl<N: ExecutionNotifier> WorkflowEngine<N> {
  pub fn with_notifier(config: EngineConfig, notifier: N) -> Self {
    Self {
      config,
      notifier,
      cancellations: Mutex::new(HashMap::new()),
    }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Run an execution from a start node to a terminal status.
  ///
  /// Failures are encoded in the returned execution (`FAILED` status plus
  /// `error_message`), not as an `Err`.
  #[instrument(
    name = "workflow_execute",
    skip(self, workflow, trigger),
    fields(workflow_id = %workflow.id())
  )]
  pub async fn execute(
    &self,
    workflow: &Workflow,
    trigger: Option<&TelemetryData>,
  ) -> WorkflowExecution {
    let mut execution = WorkflowExecution::new(
      workflow.id().clone(),
      workflow.organization_id().to_string(),
      trigger.cloned(),
    );
    let cancel = CancellationToken::new();
    self.register(execution.id().clone(), cancel.clone());

    info!(
      execution_id = %execution.id(),
      workflow_id = %workflow.id(),
      "execution_started"
    );
    self.notifier.notify(ExecutionEvent::ExecutionStarted {
      execution_id: execution.id().clone(),
      workflow_id: workflow.id().clone(),
    });

    if workflow.status() != WorkflowStatus::Active {
      self.fail(&mut execution, "workflow not active");
    }

    while self.can_continue(workflow, &execution) {
      if cancel.is_cancelled() {
        self.cancel_execution(&mut execution);
        break;
      }
      if let Err(e) = self.execute_step(workflow, &mut execution, trigger).await {
        self.fail(&mut execution, e.to_string());
        break;
      }
    }

    self.unregister(execution.id());
    execution
  }

  /// Advance an execution by exactly one node step.
  ///
  /// Domain failures (missing conditions, evaluation errors, the step cap,
  /// timeouts) terminate the execution and return `Ok`; `Err` is reserved
  /// for caller misuse such as stepping a finished or paused execution.
  pub async fn execute_step(
    &self,
    workflow: &Workflow,
    execution: &mut WorkflowExecution,
    trigger: Option<&TelemetryData>,
  ) -> Result<(), EngineError> {
    match execution.status() {
      ExecutionStatus::Running => {}
      status if status.is_terminal() => {
        return Err(EngineError::ExecutionFinished(execution.id().clone()));
      }
      _ => return Err(EngineError::NotRunning(execution.id().clone())),
    }

    if execution.steps() >= self.config.max_node_steps {
      self.fail(execution, "step limit exceeded");
      return Ok(());
    }
    execution.increment_steps();

    let node_id = match execution.current_node_id() {
      Some(id) => id.clone(),
      None => {
        // First step: land on a start node.
        let Some(start) = workflow.start_nodes().into_iter().next() else {
          self.fail(execution, "workflow has no start node");
          return Ok(());
        };
        let id = start.id().clone();
        self.enter(execution, id.clone());
        id
      }
    };
    let Some(node) = workflow.find_node(&node_id) else {
      return Err(EngineError::NodeNotFound(node_id));
    };

    let step = self.process_node(workflow, execution, node, trigger);
    if tokio::time::timeout(self.config.step_timeout, step).await.is_err() {
      self.fail(execution, "step timeout");
    } else if execution.status() != ExecutionStatus::Failed {
      self.notifier.notify(ExecutionEvent::NodeCompleted {
        execution_id: execution.id().clone(),
        node_id,
      });
    }
    Ok(())
  }

  /// Whether another step can be taken.
  pub fn can_continue(&self, workflow: &Workflow, execution: &WorkflowExecution) -> bool {
    execution.status() == ExecutionStatus::Running
      && execution
        .current_node_id()
        .is_none_or(|id| workflow.find_node(id).is_some())
  }

  /// Predict the successors of a node.
  ///
  /// For a decision/condition node with trigger data and a cleanly
  /// evaluating condition tree, this is the single routed successor;
  /// otherwise all successors in edge declaration order.
  pub fn possible_next_nodes<'a>(
    &self,
    workflow: &'a Workflow,
    current: &NodeId,
    trigger: Option<&TelemetryData>,
  ) -> Vec<&'a WorkflowNode> {
    let Some(node) = workflow.find_node(current) else {
      return Vec::new();
    };

    if node.node_type().requires_conditions()
      && trigger.is_some()
      && let Some(conditions) = node.conditions()
      && let Ok(result) = verbena_condition::evaluate(conditions, trigger)
    {
      let outgoing = workflow.outgoing_edges(current);
      if let Some(edge) = route(&outgoing, result)
        && let Some(target) = workflow.find_node(edge.target())
      {
        return vec![target];
      }
    }

    workflow.next_nodes(current)
  }

  /// Request cancellation of a live execution; it takes effect at the next
  /// step boundary. Returns whether the execution was known to the engine.
  pub fn cancel(&self, execution_id: &ExecutionId) -> bool {
    let cancellations = self.cancellations.lock().unwrap_or_else(|e| e.into_inner());
    match cancellations.get(execution_id) {
      Some(token) => {
        token.cancel();
        true
      }
      None => false,
    }
  }

  async fn process_node(
    &self,
    workflow: &Workflow,
    execution: &mut WorkflowExecution,
    node: &WorkflowNode,
    trigger: Option<&TelemetryData>,
  ) {
    debug!(
      execution_id = %execution.id(),
      node_id = %node.id(),
      node_type = %node.node_type(),
      "node_processing"
    );

    match node.node_type() {
      NodeType::Start | NodeType::Input | NodeType::Output => {
        self.advance(workflow, execution, node);
      }
      NodeType::Task => {
        let result = node.task_spec().cloned().unwrap_or(serde_json::Value::Null);
        execution.set_context("task_result", result);
        self.advance(workflow, execution, node);
      }
      NodeType::Action => {
        let result = node.action_spec().cloned().unwrap_or(serde_json::Value::Null);
        execution.set_context("action_result", result);
        self.advance(workflow, execution, node);
      }
      NodeType::End => self.complete(execution),
      NodeType::Decision | NodeType::Condition => {
        self.process_decision(workflow, execution, node, trigger);
      }
    }
  }

  fn process_decision(
    &self,
    workflow: &Workflow,
    execution: &mut WorkflowExecution,
    node: &WorkflowNode,
    trigger: Option<&TelemetryData>,
  ) {
    let Some(conditions) = node.conditions() else {
      self.fail(
        execution,
        format!("Decision node {} has no conditions", node.id()),
      );
      return;
    };

    let result = match verbena_condition::evaluate(conditions, trigger) {
      Ok(result) => result,
      Err(e) => {
        self.fail(execution, format!("{}: {}", node.id(), e));
        return;
      }
    };

    execution.set_context(format!("condition_result_{}", node.id()), json!(result));
    execution.set_context(
      "condition_evaluation_time",
      json!(chrono::Utc::now().to_rfc3339()),
    );
    self.notifier.notify(ExecutionEvent::ConditionEvaluated {
      execution_id: execution.id().clone(),
      node_id: node.id().clone(),
      result,
    });

    let outgoing = workflow.outgoing_edges(node.id());
    let Some(edge) = route(&outgoing, result) else {
      self.complete(execution);
      return;
    };

    execution.set_context(
      "routing_decision",
      json!(format!(
        "Condition {} -> Node {}",
        if result { "TRUE" } else { "FALSE" },
        edge.target()
      )),
    );
    self.move_to(workflow, execution, edge.target().clone());
  }

  /// Move along the first outgoing edge, or complete if there is none.
  fn advance(&self, workflow: &Workflow, execution: &mut WorkflowExecution, node: &WorkflowNode) {
    match workflow.outgoing_edges(node.id()).first() {
      Some(edge) => self.move_to(workflow, execution, edge.target().clone()),
      None => self.complete(execution),
    }
  }

  fn move_to(&self, workflow: &Workflow, execution: &mut WorkflowExecution, target: NodeId) {
    if workflow.find_node(&target).is_none() {
      self.fail(execution, format!("node '{target}' not found in workflow"));
      return;
    }
    self.enter(execution, target);
  }

  fn enter(&self, execution: &mut WorkflowExecution, node_id: NodeId) {
    execution.set_current(node_id.clone());
    self.notifier.notify(ExecutionEvent::NodeEntered {
      execution_id: execution.id().clone(),
      node_id,
    });
  }

  fn complete(&self, execution: &mut WorkflowExecution) {
    if execution.complete().is_ok() {
      info!(execution_id = %execution.id(), "execution_completed");
      self.notifier.notify(ExecutionEvent::ExecutionCompleted {
        execution_id: execution.id().clone(),
      });
    }
  }

  fn fail(&self, execution: &mut WorkflowExecution, message: impl Into<String>) {
    let message = message.into();
    if execution.fail(message.clone()).is_ok() {
      error!(
        execution_id = %execution.id(),
        error = %message,
        "execution_failed"
      );
      self.notifier.notify(ExecutionEvent::ExecutionFailed {
        execution_id: execution.id().clone(),
        error: message,
      });
    }
  }

  pub(crate) fn cancel_execution(&self, execution: &mut WorkflowExecution) {
    if execution.cancel().is_ok() {
      warn!(execution_id = %execution.id(), "execution_cancelled");
      self.notifier.notify(ExecutionEvent::ExecutionCancelled {
        execution_id: execution.id().clone(),
      });
    }
  }

  pub(crate) fn notify(&self, event: ExecutionEvent) {
    self.notifier.notify(event);
  }

  pub(crate) fn register(&self, execution_id: ExecutionId, token: CancellationToken) {
    let mut cancellations = self.cancellations.lock().unwrap_or_else(|e| e.into_inner());
    cancellations.insert(execution_id, token);
  }

  pub(crate) fn unregister(&self, execution_id: &ExecutionId) {
    let mut cancellations = self.cancellations.lock().unwrap_or_else(|e| e.into_inner());
    cancellations.remove(execution_id);
  }
}

/// Routing at a decision node: the first outgoing edge whose type matches
/// the evaluation result, else the first outgoing edge, else nothing.
fn route<'a>(outgoing: &[&'a WorkflowEdge], result: bool) -> Option<&'a WorkflowEdge> {
  let wanted = if result {
    EdgeType::ConditionalTrue
  } else {
    EdgeType::ConditionalFalse
  };
  outgoing
    .iter()
    .find(|e| e.edge_type() == wanted)
    .copied()
    .or_else(|| outgoing.first().copied())
}
