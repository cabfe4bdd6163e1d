use thiserror::Error;
use verbena_model::{ExecutionId, ExecutionStatus, NodeId, WorkflowId};

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("execution '{0}' is already terminal")]
  ExecutionFinished(ExecutionId),

  #[error("execution '{0}' is not running")]
  NotRunning(ExecutionId),

  #[error("invalid execution transition from {from} to {to}")]
  InvalidTransition {
    from: ExecutionStatus,
    to: ExecutionStatus,
  },

  #[error("node not found: {0}")]
  NodeNotFound(NodeId),

  #[error("workflow not found: {0}")]
  WorkflowNotFound(WorkflowId),

  #[error("execution command channel closed")]
  ChannelClosed,
}
