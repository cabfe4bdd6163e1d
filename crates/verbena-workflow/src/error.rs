use thiserror::Error;
use verbena_model::{NodeId, WorkflowStatus};

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("invalid workflow: {}", errors.join("; "))]
  Invalid { errors: Vec<String> },

  #[error("edge connects node '{0}' to itself")]
  SelfLoop(NodeId),

  #[error("node not found: {0}")]
  NodeNotFound(NodeId),

  #[error("invalid workflow transition from {from} to {to}")]
  InvalidTransition {
    from: WorkflowStatus,
    to: WorkflowStatus,
  },
}
