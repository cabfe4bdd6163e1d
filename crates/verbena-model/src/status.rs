//! Status and type enums shared across the workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a workflow aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
  Draft,
  Active,
  Paused,
  Completed,
  Failed,
  Archived,
}

impl WorkflowStatus {
  /// Terminal statuses permit no further transition.
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Archived
    )
  }

  /// Whether `self -> to` is a legal lifecycle transition.
  pub fn can_transition_to(&self, to: WorkflowStatus) -> bool {
    use WorkflowStatus::*;
    match (*self, to) {
      (Draft, Active) | (Draft, Archived) => true,
      (Active, Paused) | (Active, Completed) | (Active, Failed) | (Active, Archived) => true,
      (Paused, Active) | (Paused, Completed) | (Paused, Failed) | (Paused, Archived) => true,
      _ => false,
    }
  }
}

impl fmt::Display for WorkflowStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      WorkflowStatus::Draft => "draft",
      WorkflowStatus::Active => "active",
      WorkflowStatus::Paused => "paused",
      WorkflowStatus::Completed => "completed",
      WorkflowStatus::Failed => "failed",
      WorkflowStatus::Archived => "archived",
    };
    f.write_str(name)
  }
}

/// Status of a single workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
  Running,
  Paused,
  Completed,
  Failed,
  Cancelled,
  Waiting,
}

impl ExecutionStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
    )
  }

  /// Whether `self -> to` is a legal execution transition. Terminal states
  /// are absorbing; any non-terminal state may move to a terminal one.
  pub fn can_transition_to(&self, to: ExecutionStatus) -> bool {
    use ExecutionStatus::*;
    if self.is_terminal() {
      return false;
    }
    if to.is_terminal() {
      return true;
    }
    matches!(
      (*self, to),
      (Running, Waiting) | (Waiting, Running) | (Running, Paused) | (Paused, Running)
    )
  }
}

impl fmt::Display for ExecutionStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ExecutionStatus::Running => "running",
      ExecutionStatus::Paused => "paused",
      ExecutionStatus::Completed => "completed",
      ExecutionStatus::Failed => "failed",
      ExecutionStatus::Cancelled => "cancelled",
      ExecutionStatus::Waiting => "waiting",
    };
    f.write_str(name)
  }
}

/// Discriminator for workflow nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
  Start,
  End,
  Decision,
  Condition,
  Task,
  Action,
  Input,
  Output,
}

impl NodeType {
  /// Decision and Condition nodes must carry a `conditions` configuration
  /// entry to be executable.
  pub fn requires_conditions(&self) -> bool {
    matches!(self, NodeType::Decision | NodeType::Condition)
  }
}

impl fmt::Display for NodeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      NodeType::Start => "start",
      NodeType::End => "end",
      NodeType::Decision => "decision",
      NodeType::Condition => "condition",
      NodeType::Task => "task",
      NodeType::Action => "action",
      NodeType::Input => "input",
      NodeType::Output => "output",
    };
    f.write_str(name)
  }
}

/// Discriminator for workflow edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
  Default,
  ConditionalTrue,
  ConditionalFalse,
  Success,
  Error,
  DataFlow,
  ControlFlow,
}

impl fmt::Display for EdgeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      EdgeType::Default => "default",
      EdgeType::ConditionalTrue => "conditional_true",
      EdgeType::ConditionalFalse => "conditional_false",
      EdgeType::Success => "success",
      EdgeType::Error => "error",
      EdgeType::DataFlow => "data_flow",
      EdgeType::ControlFlow => "control_flow",
    };
    f.write_str(name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn workflow_terminal_states_absorb() {
    assert!(!WorkflowStatus::Completed.can_transition_to(WorkflowStatus::Active));
    assert!(!WorkflowStatus::Archived.can_transition_to(WorkflowStatus::Draft));
    assert!(!WorkflowStatus::Failed.can_transition_to(WorkflowStatus::Active));
  }

  #[test]
  fn workflow_pause_resume_cycle() {
    assert!(WorkflowStatus::Draft.can_transition_to(WorkflowStatus::Active));
    assert!(WorkflowStatus::Active.can_transition_to(WorkflowStatus::Paused));
    assert!(WorkflowStatus::Paused.can_transition_to(WorkflowStatus::Active));
    assert!(!WorkflowStatus::Draft.can_transition_to(WorkflowStatus::Paused));
  }

  #[test]
  fn execution_transitions_are_strict() {
    assert!(ExecutionStatus::Running.can_transition_to(ExecutionStatus::Waiting));
    assert!(ExecutionStatus::Waiting.can_transition_to(ExecutionStatus::Running));
    assert!(ExecutionStatus::Paused.can_transition_to(ExecutionStatus::Cancelled));
    assert!(!ExecutionStatus::Paused.can_transition_to(ExecutionStatus::Waiting));
    assert!(!ExecutionStatus::Completed.can_transition_to(ExecutionStatus::Running));
  }
}
