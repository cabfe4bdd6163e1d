//! Trigger-queue runner with channel-based dispatch.
//!
//! The `EngineRunner` owns an mpsc channel of [`WorkflowTriggerEvent`]s
//! (fed by the ingestion pipeline's threshold bridge), resolves each
//! event's workflow through the repository port, and executes it with the
//! triggering record as decision data. Concurrency is bounded by a
//! semaphore.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use verbena_store::WorkflowRepository;
use verbena_telemetry::WorkflowTriggerEvent;

use crate::engine::WorkflowEngine;
use crate::events::{ExecutionNotifier, NoopNotifier};

const DEFAULT_QUEUE_CAPACITY: usize = 100;
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Executes workflows in response to trigger events.
///
/// # Usage
///
/// ```ignore
/// let runner = EngineRunner::new(engine, workflows);
///
/// // Give the sender to the ingestion pipeline.
/// let sender = runner.sender();
///
/// // Start the dispatch loop.
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await;
/// ```
pub struct EngineRunner<N: ExecutionNotifier = NoopNotifier> {
  engine: Arc<WorkflowEngine<N>>,
  workflows: Arc<dyn WorkflowRepository>,
  sender: mpsc::Sender<WorkflowTriggerEvent>,
  receiver: mpsc::Receiver<WorkflowTriggerEvent>,
  limit: Arc<Semaphore>,
}

impl<N: ExecutionNotifier + 'static> EngineRunner<N> {
  /// Create a runner with default queue capacity and concurrency bound.
  pub fn new(engine: Arc<WorkflowEngine<N>>, workflows: Arc<dyn WorkflowRepository>) -> Self {
    Self::with_capacity(
      engine,
      workflows,
      DEFAULT_QUEUE_CAPACITY,
      DEFAULT_MAX_CONCURRENT,
    )
  }

  pub fn with_capacity(
    engine: Arc<WorkflowEngine<N>>,
    workflows: Arc<dyn WorkflowRepository>,
    queue_capacity: usize,
    max_concurrent: usize,
  ) -> Self {
    let (sender, receiver) = mpsc::channel(queue_capacity);
    Self {
      engine,
      workflows,
      sender,
      receiver,
      limit: Arc::new(Semaphore::new(max_concurrent)),
    }
  }

  /// Get a sender handle for enqueueing trigger events.
  pub fn sender(&self) -> mpsc::Sender<WorkflowTriggerEvent> {
    self.sender.clone()
  }

  /// Run the dispatch loop until cancelled or the queue closes.
  pub async fn start(mut self, cancel: CancellationToken) {
    info!("engine runner started");

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!("engine runner cancelled");
          break;
        }
        event = self.receiver.recv() => {
          match event {
            Some(event) => self.dispatch(event).await,
            None => {
              info!("trigger queue closed");
              break;
            }
          }
        }
      }
    }
  }

  async fn dispatch(&self, event: WorkflowTriggerEvent) {
    let workflow = match self.workflows.find_by_id(&event.workflow_id).await {
      Ok(Some(workflow)) => workflow,
      Ok(None) => {
        warn!(
          workflow_id = %event.workflow_id,
          "trigger references unknown workflow, skipping"
        );
        return;
      }
      Err(e) => {
        error!(
          workflow_id = %event.workflow_id,
          error = %e,
          "workflow lookup failed, skipping trigger"
        );
        return;
      }
    };

    // Semaphore is never closed, so acquire only fails on shutdown.
    let Ok(permit) = self.limit.clone().acquire_owned().await else {
      return;
    };

    let engine = self.engine.clone();
    tokio::spawn(async move {
      let _permit = permit;
      let execution = engine.execute(&workflow, Some(&event.telemetry)).await;
      info!(
        execution_id = %execution.id(),
        workflow_id = %workflow.id(),
        status = %execution.status(),
        "triggered_execution_finished"
      );
    });
  }
}
