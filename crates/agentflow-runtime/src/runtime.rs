//! Workflow runtime.
//!
//! [`Runtime`] is the entry point for executing workflows. It loads a
//! definition from the store, locks it into a tree, binds every step to a
//! registered behavior, gates on activity and trigger kind, and then walks
//! the tree on a spawned task. Callers either await the result or consume the
//! run's events as a stream.

use std::sync::Arc;
use std::time::Duration;

use agentflow_behavior::{BehaviorBindings, BehaviorRegistry, ExecutionState, TextModel};
use agentflow_config::{FailurePolicy, TriggerKind};
use agentflow_store::DefinitionStore;
use agentflow_workflow::Workflow;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::dispatcher::{RunContext, walk};
use crate::error::RuntimeError;
use crate::events::{ChannelNotifier, RunEvent};
use crate::result::{RunResult, SkipReason};
use crate::stream::{EventStream, RunHandle};

/// Default deadline of a single run.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Configuration for the runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Deadline of a run unless the request overrides it.
  pub run_timeout: Duration,
  /// What a failing step does to the rest of the run.
  pub failure_policy: FailurePolicy,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      run_timeout: DEFAULT_RUN_TIMEOUT,
      failure_policy: FailurePolicy::default(),
    }
  }
}

/// One invocation of a workflow.
#[derive(Debug, Clone)]
pub struct RunRequest {
  pub workflow_id: String,
  pub trigger: TriggerKind,
  /// Seed of the root state. `null` means empty; anything else must be an object.
  pub payload: Value,
  pub streaming: bool,
  pub timeout: Option<Duration>,
  /// Parent token; cancelling it cancels the run.
  pub cancel: Option<CancellationToken>,
}

impl RunRequest {
  pub fn new(workflow_id: impl Into<String>, trigger: TriggerKind, payload: Value) -> Self {
    Self {
      workflow_id: workflow_id.into(),
      trigger,
      payload,
      streaming: false,
      timeout: None,
      cancel: None,
    }
  }

  pub fn streaming(mut self) -> Self {
    self.streaming = true;
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
    self.cancel = Some(cancel);
    self
  }
}

/// How a run is handed back, per the request's `streaming` flag.
pub enum RunDelivery {
  Result(RunResult),
  Stream(EventStream),
}

/// The workflow runtime.
///
/// Cheap to share behind an `Arc`; every run owns its own state.
pub struct Runtime {
  store: Arc<dyn DefinitionStore>,
  registry: Arc<BehaviorRegistry>,
  text_model: Arc<dyn TextModel>,
  config: RuntimeConfig,
}

impl Runtime {
  pub fn new(
    store: Arc<dyn DefinitionStore>,
    registry: Arc<BehaviorRegistry>,
    text_model: Arc<dyn TextModel>,
  ) -> Self {
    Self {
      store,
      registry,
      text_model,
      config: RuntimeConfig::default(),
    }
  }

  pub fn with_config(mut self, config: RuntimeConfig) -> Self {
    self.config = config;
    self
  }

  pub fn config(&self) -> &RuntimeConfig {
    &self.config
  }

  pub fn registry(&self) -> &BehaviorRegistry {
    &self.registry
  }

  /// Run a workflow, delivering either the final result or a live stream.
  #[instrument(
    name = "runtime_run",
    skip(self, request),
    fields(workflow_id = %request.workflow_id, trigger = %request.trigger)
  )]
  pub async fn run(&self, request: RunRequest) -> Result<RunDelivery, RuntimeError> {
    let streaming = request.streaming;
    let handle = self.start(request).await?;

    if streaming {
      Ok(RunDelivery::Stream(handle.into_stream()))
    } else {
      handle.wait().await.map(RunDelivery::Result)
    }
  }

  /// Run a workflow and await its result.
  pub async fn run_to_completion(
    &self,
    workflow_id: &str,
    trigger: TriggerKind,
    payload: Value,
  ) -> Result<RunResult, RuntimeError> {
    self
      .start(RunRequest::new(workflow_id, trigger, payload))
      .await?
      .wait()
      .await
  }

  /// Run a workflow and observe it as a stream of events.
  pub async fn run_streaming(
    &self,
    workflow_id: &str,
    trigger: TriggerKind,
    payload: Value,
  ) -> Result<EventStream, RuntimeError> {
    let request = RunRequest::new(workflow_id, trigger, payload).streaming();
    Ok(self.start(request).await?.into_stream())
  }

  /// Load, lock and bind a workflow without running it.
  pub async fn validate(&self, workflow_id: &str) -> Result<Workflow, RuntimeError> {
    let (workflow, _) = self.prepare(workflow_id).await?;
    Ok(workflow)
  }

  /// Start a run.
  ///
  /// Configuration errors are returned here, before anything executes. A
  /// skipped run yields a handle whose only event is the terminal one.
  #[instrument(
    name = "runtime_start",
    skip(self, request),
    fields(workflow_id = %request.workflow_id)
  )]
  pub async fn start(&self, request: RunRequest) -> Result<RunHandle, RuntimeError> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    let (workflow, bindings) = self.prepare(&request.workflow_id).await?;
    let seed = ExecutionState::from_payload(request.payload).map_err(|e| {
      RuntimeError::InvalidPayload {
        message: e.to_string(),
      }
    })?;

    let (sender, receiver) = mpsc::unbounded_channel();

    if let Some(reason) = gate(&workflow, &bindings, request.trigger) {
      info!(
        execution_id = %execution_id,
        workflow_id = %workflow.workflow_id,
        reason = ?reason,
        "workflow_skipped"
      );
      let _ = sender.send(RunEvent::Finished(Ok(RunResult::Skipped(reason))));
      return Ok(RunHandle::new(execution_id, receiver, None));
    }

    let cancel = request
      .cancel
      .map(|parent| parent.child_token())
      .unwrap_or_default();
    let timeout = request.timeout.unwrap_or(self.config.run_timeout);

    info!(
      execution_id = %execution_id,
      workflow_id = %workflow.workflow_id,
      trigger = %request.trigger,
      steps = workflow.tree.len(),
      "workflow_started"
    );

    let ctx = Arc::new(RunContext::new(
      execution_id.clone(),
      workflow.workflow_id.clone(),
      workflow.organization_id.clone(),
      bindings,
      self.text_model.clone(),
      Arc::new(ChannelNotifier::new(sender.clone())),
      cancel.clone(),
      self.config.failure_policy,
    ));
    let root = workflow.tree.root().clone();

    tokio::spawn(async move {
      let result = walk(ctx.clone(), root, seed, timeout).await;

      match &result {
        Ok(RunResult::Completed(report)) => info!(
          execution_id = %ctx.execution_id,
          executed = report.executed.len(),
          failures = report.failures.len(),
          "workflow_completed"
        ),
        Ok(RunResult::Skipped(_)) => {}
        Err(RuntimeError::Cancelled) => {
          warn!(execution_id = %ctx.execution_id, "workflow_cancelled")
        }
        Err(e) => error!(execution_id = %ctx.execution_id, error = %e, "workflow_failed"),
      }

      // The consumer may be gone; the run is over either way.
      let _ = sender.send(RunEvent::Finished(result));
    });

    Ok(RunHandle::new(
      execution_id,
      receiver,
      Some(cancel.drop_guard()),
    ))
  }

  async fn prepare(&self, workflow_id: &str) -> Result<(Workflow, BehaviorBindings), RuntimeError> {
    let def = self
      .store
      .load_workflow(workflow_id)
      .await
      .map_err(|e| match e {
        agentflow_store::Error::NotFound(_) => RuntimeError::WorkflowNotFound {
          workflow_id: workflow_id.to_string(),
        },
        source => RuntimeError::Store {
          workflow_id: workflow_id.to_string(),
          source,
        },
      })?;

    let workflow = Workflow::lock(&def)?;
    let bindings = self.registry.resolve_all(&workflow.tree)?;
    Ok((workflow, bindings))
  }
}

/// Decide whether a run should be skipped.
///
/// A root behavior that declares no trigger kind accepts any invocation.
fn gate(workflow: &Workflow, bindings: &BehaviorBindings, trigger: TriggerKind) -> Option<SkipReason> {
  if !workflow.active {
    return Some(SkipReason::Inactive);
  }

  let expected = bindings
    .get(workflow.root().id())
    .and_then(|behavior| behavior.trigger_kind())?;
  (expected != trigger).then_some(SkipReason::TriggerKindMismatch {
    expected,
    actual: trigger,
  })
}
