//! Execution events and notifiers for observability.
//!
//! The engine emits an event at each step boundary. Consumers decide what
//! to do with them: persist, stream, or ignore.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use verbena_model::{ExecutionId, NodeId, WorkflowId};

/// Events emitted while an execution is driven through its graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// An execution has been created and is running.
  ExecutionStarted {
    execution_id: ExecutionId,
    workflow_id: WorkflowId,
  },

  /// The execution arrived at a node.
  NodeEntered {
    execution_id: ExecutionId,
    node_id: NodeId,
  },

  /// A node's processing finished without failing the execution. Emitted
  /// after the node's effects, including any terminal transition, are
  /// applied.
  NodeCompleted {
    execution_id: ExecutionId,
    node_id: NodeId,
  },

  /// A decision or condition node evaluated its conditions.
  ConditionEvaluated {
    execution_id: ExecutionId,
    node_id: NodeId,
    result: bool,
  },

  /// The execution reached a terminal COMPLETED status.
  ExecutionCompleted { execution_id: ExecutionId },

  /// The execution failed; the message mirrors `error_message`.
  ExecutionFailed {
    execution_id: ExecutionId,
    error: String,
  },

  /// The execution was cancelled at a step boundary.
  ExecutionCancelled { execution_id: ExecutionId },
}

/// Trait for receiving execution events.
///
/// The engine calls `notify` for each event - implementations decide what
/// to do with them (persist, broadcast, log, ignore, etc.).
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {
    // Intentionally empty
  }
}

/// A notifier that sends events to an unbounded channel.
///
/// Use this when events are consumed asynchronously (persisted to a store,
/// streamed to a UI, etc.). The channel is unbounded so a slow consumer
/// never blocks the engine; event volume is a handful per execution step.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
