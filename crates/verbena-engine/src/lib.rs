//! Verbena Engine
//!
//! Drives live workflow executions through their graphs. The engine
//! consults the condition evaluator at decision nodes, routes along typed
//! edges, and records a trace of traversed nodes plus a terminal status on
//! each [`WorkflowExecution`].
//!
//! Three ways to drive work:
//! - [`WorkflowEngine::execute`] runs one execution to a terminal status.
//! - [`WorkflowEngine::execute_step`] advances an execution by exactly one
//!   node, for callers that own the stepping loop.
//! - [`WorkflowEngine::spawn`] puts an execution behind a per-execution
//!   command channel (`step | pause | resume | cancel | run`), returning an
//!   [`ExecutionHandle`]; one task owns the execution, so steps are
//!   mutually exclusive by construction.
//!
//! [`EngineRunner`] closes the loop with telemetry: it consumes
//! [`WorkflowTriggerEvent`]s from the threshold bridge, resolves the target
//! workflow through the repository port, and spawns bounded concurrent
//! executions.
//!
//! [`WorkflowTriggerEvent`]: verbena_telemetry::WorkflowTriggerEvent

mod engine;
mod error;
mod events;
mod execution;
mod handle;
mod runner;

pub use engine::{EngineConfig, MAX_NODE_STEPS, WorkflowEngine};
pub use error::EngineError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use execution::WorkflowExecution;
pub use handle::{ExecutionCommand, ExecutionHandle};
pub use runner::EngineRunner;
