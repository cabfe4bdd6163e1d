//! Per-execution command channels.
//!
//! `WorkflowEngine::spawn` moves an execution into its own task; the task
//! owns the [`WorkflowExecution`] and consumes commands from a channel, so
//! exactly one worker ever advances it. The returned [`ExecutionHandle`]
//! is the only way to reach the execution while it is live.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::info;
use verbena_model::{ExecutionId, ExecutionStatus};
use verbena_telemetry::TelemetryData;
use verbena_workflow::Workflow;

use crate::engine::WorkflowEngine;
use crate::error::EngineError;
use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::execution::WorkflowExecution;

/// Commands accepted by a spawned execution's driver task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionCommand {
  /// Advance by one node step.
  Step,
  /// Pause a running execution.
  Pause,
  /// Resume a paused execution.
  Resume,
  /// Cancel at the next step boundary.
  Cancel,
  /// Step continuously until a terminal status.
  Run,
}

/// Handle to a spawned execution.
pub struct ExecutionHandle {
  execution_id: ExecutionId,
  commands: mpsc::Sender<ExecutionCommand>,
  result: oneshot::Receiver<WorkflowExecution>,
}

impl ExecutionHandle {
  pub fn id(&self) -> &ExecutionId {
    &self.execution_id
  }

  pub async fn step(&self) -> Result<(), EngineError> {
    self.send(ExecutionCommand::Step).await
  }

  pub async fn pause(&self) -> Result<(), EngineError> {
    self.send(ExecutionCommand::Pause).await
  }

  pub async fn resume(&self) -> Result<(), EngineError> {
    self.send(ExecutionCommand::Resume).await
  }

  pub async fn cancel(&self) -> Result<(), EngineError> {
    self.send(ExecutionCommand::Cancel).await
  }

  /// Ask the driver to run to a terminal status.
  pub async fn run(&self) -> Result<(), EngineError> {
    self.send(ExecutionCommand::Run).await
  }

  /// Wait for the driver to finish and take the final execution.
  pub async fn wait(self) -> Result<WorkflowExecution, EngineError> {
    self.result.await.map_err(|_| EngineError::ChannelClosed)
  }

  async fn send(&self, command: ExecutionCommand) -> Result<(), EngineError> {
    self
      .commands
      .send(command)
      .await
      .map_err(|_| EngineError::ChannelClosed)
  }
}

impl<N: ExecutionNotifier + 'static> WorkflowEngine<N> {
  /// Spawn an execution behind a command channel.
  ///
  /// The driver task owns the execution until it reaches a terminal
  /// status (or the handle is dropped while idle), then delivers it
  /// through [`ExecutionHandle::wait`].
  pub fn spawn(
    self: &Arc<Self>,
    workflow: Workflow,
    trigger: Option<TelemetryData>,
  ) -> ExecutionHandle {
    let engine = Arc::clone(self);
    let (commands, mut command_rx) = mpsc::channel(16);
    let (result_tx, result) = oneshot::channel();

    let mut execution = WorkflowExecution::new(
      workflow.id().clone(),
      workflow.organization_id().to_string(),
      trigger.clone(),
    );
    let execution_id = execution.id().clone();
    let cancel = CancellationToken::new();
    engine.register(execution_id.clone(), cancel.clone());
    let task_execution_id = execution_id.clone();

    tokio::spawn(async move {
      info!(
        execution_id = %execution.id(),
        workflow_id = %workflow.id(),
        "execution_started"
      );
      engine.notify(ExecutionEvent::ExecutionStarted {
        execution_id: execution.id().clone(),
        workflow_id: workflow.id().clone(),
      });

      let mut auto = false;
      loop {
        if execution.is_terminal() {
          break;
        }
        if cancel.is_cancelled() {
          engine.cancel_execution(&mut execution);
          break;
        }

        // In auto mode a pending command takes priority over the next
        // step; otherwise block until a command arrives.
        let command = if auto && execution.status() == ExecutionStatus::Running {
          command_rx.try_recv().ok()
        } else {
          tokio::select! {
            _ = cancel.cancelled() => {
              engine.cancel_execution(&mut execution);
              break;
            }
            command = command_rx.recv() => match command {
              Some(command) => Some(command),
              None => break,
            }
          }
        };

        match command {
          Some(ExecutionCommand::Step) | None => {
            let _ = engine
              .execute_step(&workflow, &mut execution, trigger.as_ref())
              .await;
          }
          Some(ExecutionCommand::Run) => auto = true,
          Some(ExecutionCommand::Pause) => {
            let _ = execution.pause();
          }
          Some(ExecutionCommand::Resume) => {
            let _ = execution.resume();
          }
          Some(ExecutionCommand::Cancel) => {
            engine.cancel_execution(&mut execution);
          }
        }
      }

      engine.unregister(&task_execution_id);
      let _ = result_tx.send(execution);
    });

    ExecutionHandle {
      execution_id,
      commands,
      result,
    }
  }
}
