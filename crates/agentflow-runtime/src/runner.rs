//! Schedule runner.
//!
//! The [`ScheduleRunner`] consumes [`ScheduleMessage`]s from the scheduler's
//! channel and starts one `schedule` run per message.

use std::sync::Arc;

use agentflow_config::TriggerKind;
use agentflow_store::{DefinitionStore, ScheduleMessage, Scheduler};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::RuntimeError;
use crate::result::RunResult;
use crate::runtime::{RunDelivery, RunRequest, Runtime};

/// Executes scheduled runs one at a time.
///
/// ```ignore
/// let (scheduler, receiver) = Scheduler::channel(100);
/// schedule_all(store.as_ref(), &scheduler).await?;
///
/// let runner = ScheduleRunner::new(runtime, receiver);
/// runner.start(cancel).await;
/// ```
pub struct ScheduleRunner {
  runtime: Arc<Runtime>,
  receiver: mpsc::Receiver<ScheduleMessage>,
}

impl ScheduleRunner {
  pub fn new(runtime: Arc<Runtime>, receiver: mpsc::Receiver<ScheduleMessage>) -> Self {
    Self { runtime, receiver }
  }

  /// Run until `cancel` fires or every sender is gone.
  pub async fn start(mut self, cancel: CancellationToken) {
    info!("starting schedule runner");

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!("schedule runner cancelled");
          break;
        }
        message = self.receiver.recv() => {
          match message {
            Some(message) => self.execute(message, cancel.child_token()).await,
            None => {
              info!("schedule runner channel closed");
              break;
            }
          }
        }
      }
    }
  }

  async fn execute(&self, message: ScheduleMessage, cancel: CancellationToken) {
    let workflow_id = message.workflow_id;
    info!(workflow_id = %workflow_id, "triggering scheduled run");

    let request =
      RunRequest::new(workflow_id.as_str(), TriggerKind::Schedule, Value::Null).with_cancel(cancel);

    match self.runtime.run(request).await {
      Ok(RunDelivery::Result(RunResult::Completed(report))) => info!(
        workflow_id = %workflow_id,
        execution_id = %report.execution_id,
        executed = report.executed.len(),
        failures = report.failures.len(),
        "scheduled run completed"
      ),
      Ok(RunDelivery::Result(RunResult::Skipped(reason))) => {
        info!(workflow_id = %workflow_id, reason = ?reason, "scheduled run skipped")
      }
      Ok(RunDelivery::Stream(_)) => {}
      Err(RuntimeError::Cancelled) => {
        info!(workflow_id = %workflow_id, "scheduled run cancelled")
      }
      Err(e) => error!(workflow_id = %workflow_id, error = %e, "scheduled run failed"),
    }
  }
}

/// Start a schedule for every active workflow whose root is a `schedule`
/// trigger with an interval. Returns how many were started.
pub async fn schedule_all(
  store: &dyn DefinitionStore,
  scheduler: &Scheduler,
) -> Result<usize, agentflow_store::Error> {
  let mut started = 0;
  for workflow in store.list_workflows().await? {
    if !workflow.active {
      continue;
    }
    let Some(hours) = workflow.schedule_interval_hours() else {
      continue;
    };
    match scheduler.start_schedule(&workflow.id, hours) {
      Ok(()) => started += 1,
      Err(e) => warn!(workflow_id = %workflow.id, error = %e, "schedule not started"),
    }
  }
  Ok(started)
}
