use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use verbena_model::{ExecutionId, ExecutionStatus, NodeId, WorkflowId};
use verbena_telemetry::TelemetryData;

use crate::error::EngineError;

/// One live run of a workflow.
///
/// Executions reference their workflow and trigger record by value/id, not
/// ownership; the workflow aggregate lives elsewhere. Status transitions
/// are strict: the matrix in [`ExecutionStatus::can_transition_to`] is
/// enforced and terminal states absorb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
  id: ExecutionId,
  workflow_id: WorkflowId,
  organization_id: String,
  status: ExecutionStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  current_node_id: Option<NodeId>,
  started_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  completed_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  trigger_data: Option<TelemetryData>,
  #[serde(skip_serializing_if = "Option::is_none")]
  error_message: Option<String>,
  #[serde(default)]
  context: HashMap<String, serde_json::Value>,
  /// Nodes traversed so far, in visit order.
  #[serde(default)]
  trace: Vec<NodeId>,
  #[serde(default)]
  steps: u32,
}

impl WorkflowExecution {
  /// Create a running execution with a generated id.
  pub fn new(
    workflow_id: WorkflowId,
    organization_id: impl Into<String>,
    trigger_data: Option<TelemetryData>,
  ) -> Self {
    Self {
      id: ExecutionId::generate(),
      workflow_id,
      organization_id: organization_id.into(),
      status: ExecutionStatus::Running,
      current_node_id: None,
      started_at: Utc::now(),
      completed_at: None,
      trigger_data,
      error_message: None,
      context: HashMap::new(),
      trace: Vec::new(),
      steps: 0,
    }
  }

  pub fn id(&self) -> &ExecutionId {
    &self.id
  }

  pub fn workflow_id(&self) -> &WorkflowId {
    &self.workflow_id
  }

  pub fn organization_id(&self) -> &str {
    &self.organization_id
  }

  pub fn status(&self) -> ExecutionStatus {
    self.status
  }

  pub fn current_node_id(&self) -> Option<&NodeId> {
    self.current_node_id.as_ref()
  }

  pub fn started_at(&self) -> DateTime<Utc> {
    self.started_at
  }

  pub fn completed_at(&self) -> Option<DateTime<Utc>> {
    self.completed_at
  }

  pub fn trigger_data(&self) -> Option<&TelemetryData> {
    self.trigger_data.as_ref()
  }

  pub fn error_message(&self) -> Option<&str> {
    self.error_message.as_deref()
  }

  pub fn context(&self) -> &HashMap<String, serde_json::Value> {
    &self.context
  }

  pub fn context_value(&self, key: &str) -> Option<&serde_json::Value> {
    self.context.get(key)
  }

  pub fn trace(&self) -> &[NodeId] {
    &self.trace
  }

  pub fn steps(&self) -> u32 {
    self.steps
  }

  pub fn is_terminal(&self) -> bool {
    self.status.is_terminal()
  }

  /// Elapsed time: until completion for terminal executions, until now
  /// otherwise.
  pub fn duration(&self) -> Duration {
    self.completed_at.unwrap_or_else(Utc::now) - self.started_at
  }

  /// Move to a new status, enforcing the transition matrix. Entering a
  /// terminal status stamps `completed_at`.
  pub fn transition_to(&mut self, to: ExecutionStatus) -> Result<(), EngineError> {
    if !self.status.can_transition_to(to) {
      return Err(EngineError::InvalidTransition {
        from: self.status,
        to,
      });
    }
    self.status = to;
    if to.is_terminal() {
      self.completed_at = Some(Utc::now());
    }
    Ok(())
  }

  pub fn pause(&mut self) -> Result<(), EngineError> {
    self.transition_to(ExecutionStatus::Paused)
  }

  pub fn resume(&mut self) -> Result<(), EngineError> {
    self.transition_to(ExecutionStatus::Running)
  }

  pub fn complete(&mut self) -> Result<(), EngineError> {
    self.transition_to(ExecutionStatus::Completed)
  }

  pub fn cancel(&mut self) -> Result<(), EngineError> {
    self.transition_to(ExecutionStatus::Cancelled)
  }

  /// Fail with a human-readable message.
  pub fn fail(&mut self, message: impl Into<String>) -> Result<(), EngineError> {
    self.transition_to(ExecutionStatus::Failed)?;
    self.error_message = Some(message.into());
    Ok(())
  }

  pub(crate) fn set_current(&mut self, node_id: NodeId) {
    self.trace.push(node_id.clone());
    self.current_node_id = Some(node_id);
  }

  pub(crate) fn set_context(&mut self, key: impl Into<String>, value: serde_json::Value) {
    self.context.insert(key.into(), value);
  }

  pub(crate) fn increment_steps(&mut self) {
    self.steps += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn execution() -> WorkflowExecution {
    WorkflowExecution::new(WorkflowId::generate(), "org-1", None)
  }

  #[test]
  fn starts_running() {
    let execution = execution();
    assert_eq!(execution.status(), ExecutionStatus::Running);
    assert!(execution.completed_at().is_none());
    assert!(!execution.is_terminal());
  }

  #[test]
  fn pause_resume_cycle() {
    let mut execution = execution();
    execution.pause().unwrap();
    assert_eq!(execution.status(), ExecutionStatus::Paused);
    execution.resume().unwrap();
    assert_eq!(execution.status(), ExecutionStatus::Running);
  }

  #[test]
  fn waiting_is_reachable_only_from_running() {
    let mut execution = execution();
    execution.transition_to(ExecutionStatus::Waiting).unwrap();
    execution.transition_to(ExecutionStatus::Running).unwrap();

    execution.pause().unwrap();
    let err = execution.transition_to(ExecutionStatus::Waiting).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
  }

  #[test]
  fn terminal_states_absorb() {
    let mut execution = execution();
    execution.complete().unwrap();
    assert!(execution.is_terminal());
    assert!(execution.completed_at().is_some());

    assert!(execution.resume().is_err());
    assert!(execution.cancel().is_err());
    assert!(execution.fail("late").is_err());
    assert!(execution.error_message().is_none());
  }

  #[test]
  fn failure_carries_message_and_completion() {
    let mut execution = execution();
    execution.fail("boom").unwrap();
    assert_eq!(execution.status(), ExecutionStatus::Failed);
    assert_eq!(execution.error_message(), Some("boom"));
    assert!(execution.completed_at().is_some());
  }

  #[test]
  fn duration_uses_completion_time() {
    let mut execution = execution();
    execution.complete().unwrap();
    let d1 = execution.duration();
    let d2 = execution.duration();
    assert_eq!(d1, d2);
    assert!(d1 >= Duration::zero());
  }
}
