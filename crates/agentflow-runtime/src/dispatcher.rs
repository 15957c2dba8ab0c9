//! Tree walk.
//!
//! Each node runs its behavior against the state its parent produced, merges
//! the returned delta into a fresh snapshot, and hands that snapshot to every
//! child. A single child runs inline; siblings are spawned as separate tasks
//! so independent branches progress concurrently.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentflow_behavior::{
  Behavior, BehaviorBindings, BehaviorError, BehaviorInput, ExecutionState, StateDelta,
  TextModel, render_config,
};
use agentflow_config::FailurePolicy;
use agentflow_workflow::StepNode;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::RuntimeError;
use crate::events::{NodeEvent, NodeOutcome, RunNotifier};
use crate::result::{LeafState, NodeFailure, RunReport, RunResult};

/// Shared, read-only context of one run.
pub(crate) struct RunContext {
  pub execution_id: String,
  pub workflow_id: String,
  pub organization_id: String,
  pub bindings: BehaviorBindings,
  pub text_model: Arc<dyn TextModel>,
  pub notifier: Arc<dyn RunNotifier>,
  pub cancel: CancellationToken,
  pub policy: FailurePolicy,
  aborted_by: Mutex<Option<NodeFailure>>,
}

impl RunContext {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    execution_id: String,
    workflow_id: String,
    organization_id: String,
    bindings: BehaviorBindings,
    text_model: Arc<dyn TextModel>,
    notifier: Arc<dyn RunNotifier>,
    cancel: CancellationToken,
    policy: FailurePolicy,
  ) -> Self {
    Self {
      execution_id,
      workflow_id,
      organization_id,
      bindings,
      text_model,
      notifier,
      cancel,
      policy,
      aborted_by: Mutex::new(None),
    }
  }

  /// Record a failure. Under `AbortRun` the first one cancels the run.
  fn record_failure(&self, failure: &NodeFailure) {
    if self.policy != FailurePolicy::AbortRun {
      return;
    }
    if let Ok(mut aborted_by) = self.aborted_by.lock()
      && aborted_by.is_none()
    {
      *aborted_by = Some(failure.clone());
      self.cancel.cancel();
    }
  }

  fn take_abort(&self) -> Option<NodeFailure> {
    self.aborted_by.lock().ok().and_then(|mut a| a.take())
  }
}

/// What became of one node and everything below it.
#[derive(Debug)]
pub(crate) enum Branch {
  Completed {
    node_id: String,
    state: ExecutionState,
    children: Vec<Branch>,
  },
  Failed(NodeFailure),
  /// Never started, or interrupted by cancellation.
  Cancelled,
}

enum Interrupted {
  Cancelled,
  Failed(String),
}

/// Walk the tree from `root` and turn the outcome into a run result.
///
/// The deadline cancels the run's token; the walk is still awaited so every
/// spawned branch has observed the cancellation before this returns.
pub(crate) async fn walk(
  ctx: Arc<RunContext>,
  root: Arc<StepNode>,
  seed: ExecutionState,
  timeout: Duration,
) -> Result<RunResult, RuntimeError> {
  let mut tree = std::pin::pin!(run_node(ctx.clone(), root, seed.clone()));

  let finished = tokio::select! {
    branch = &mut tree => Some(branch),
    _ = tokio::time::sleep(timeout) => None,
  };
  let timed_out = finished.is_none();
  let branch = match finished {
    Some(branch) => branch,
    None => {
      warn!(execution_id = %ctx.execution_id, timeout_ms = timeout.as_millis() as u64, "workflow deadline exceeded");
      ctx.cancel.cancel();
      tree.await
    }
  };

  if let Some(failure) = ctx.take_abort() {
    return Err(RuntimeError::NodeFailed {
      node_id: failure.node_id,
      message: failure.error,
    });
  }
  if timed_out {
    return Err(RuntimeError::DeadlineExceeded { timeout });
  }
  if ctx.cancel.is_cancelled() {
    return Err(RuntimeError::Cancelled);
  }

  Ok(RunResult::Completed(aggregate(&ctx, branch, seed)))
}

/// Run `node` on `state`, then its children on the merged result.
pub(crate) fn run_node(
  ctx: Arc<RunContext>,
  node: Arc<StepNode>,
  state: ExecutionState,
) -> BoxFuture<'static, Branch> {
  async move {
    if ctx.cancel.is_cancelled() {
      return Branch::Cancelled;
    }

    let node_id = node.id().to_string();
    let behavior_id = node.step.behavior_id.clone();

    let outcome = match ctx.bindings.get(&node_id) {
      Some(behavior) => execute(&ctx, &node, behavior.as_ref(), &state).await,
      None => Err(Interrupted::Failed(format!(
        "no behavior bound for step '{}'",
        node_id
      ))),
    };

    let delta = match outcome {
      Ok(delta) => delta,
      Err(Interrupted::Cancelled) => {
        warn!(execution_id = %ctx.execution_id, node_id = %node_id, "task_cancelled");
        return Branch::Cancelled;
      }
      Err(Interrupted::Failed(message)) => {
        error!(
          execution_id = %ctx.execution_id,
          node_id = %node_id,
          behavior_id = %behavior_id,
          error = %message,
          "task_failed"
        );
        let failure = NodeFailure {
          node_id: node_id.clone(),
          behavior_id: behavior_id.clone(),
          error: message.clone(),
        };
        ctx.notifier.notify(NodeEvent {
          execution_id: ctx.execution_id.clone(),
          node_id,
          behavior_id,
          outcome: NodeOutcome::Failed { error: message },
        });
        ctx.record_failure(&failure);
        return Branch::Failed(failure);
      }
    };

    info!(
      execution_id = %ctx.execution_id,
      node_id = %node_id,
      behavior_id = %behavior_id,
      keys = delta.len(),
      "task_completed"
    );

    let next = state.merge(&delta);
    ctx.notifier.notify(NodeEvent {
      execution_id: ctx.execution_id.clone(),
      node_id: node_id.clone(),
      behavior_id,
      outcome: NodeOutcome::Completed { delta },
    });

    let children = match node.children.as_slice() {
      [] => Vec::new(),
      [only] => vec![run_node(ctx.clone(), only.clone(), next.clone()).await],
      many => run_siblings(&ctx, many, &next).await,
    };

    Branch::Completed {
      node_id,
      state: next,
      children,
    }
  }
  .boxed()
}

async fn run_siblings(
  ctx: &Arc<RunContext>,
  children: &[Arc<StepNode>],
  state: &ExecutionState,
) -> Vec<Branch> {
  let handles: Vec<_> = children
    .iter()
    .map(|child| tokio::spawn(run_node(ctx.clone(), child.clone(), state.clone())))
    .collect();

  futures::future::join_all(handles)
    .await
    .into_iter()
    .zip(children)
    .map(|(joined, child)| {
      joined.unwrap_or_else(|e| {
        let failure = NodeFailure {
          node_id: child.id().to_string(),
          behavior_id: child.step.behavior_id.clone(),
          error: format!("task join error: {}", e),
        };
        error!(execution_id = %ctx.execution_id, node_id = %failure.node_id, error = %failure.error, "task_failed");
        ctx.record_failure(&failure);
        Branch::Failed(failure)
      })
    })
    .collect()
}

async fn execute(
  ctx: &RunContext,
  node: &StepNode,
  behavior: &dyn Behavior,
  state: &ExecutionState,
) -> Result<StateDelta, Interrupted> {
  let config = render_config(&node.step.config, state).map_err(|e| Interrupted::Failed(e.to_string()))?;

  info!(
    execution_id = %ctx.execution_id,
    node_id = %node.id(),
    behavior_id = %behavior.id(),
    "task_started"
  );

  let input = BehaviorInput {
    node_id: node.id(),
    execution_id: &ctx.execution_id,
    organization_id: &ctx.organization_id,
    config: &config,
    state,
    text_model: ctx.text_model.as_ref(),
    cancel: &ctx.cancel,
  };

  let result = tokio::select! {
    biased;
    _ = ctx.cancel.cancelled() => return Err(Interrupted::Cancelled),
    result = AssertUnwindSafe(behavior.execute(input)).catch_unwind() => result,
  };

  match result {
    Ok(Ok(delta)) => Ok(delta),
    Ok(Err(BehaviorError::Cancelled)) if ctx.cancel.is_cancelled() => Err(Interrupted::Cancelled),
    Ok(Err(e)) => Err(Interrupted::Failed(e.to_string())),
    Err(panic) => Err(Interrupted::Failed(format!(
      "behavior panicked: {}",
      panic_message(panic.as_ref())
    ))),
  }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
  if let Some(s) = panic.downcast_ref::<&str>() {
    *s
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.as_str()
  } else {
    "unknown panic"
  }
}

#[derive(Default)]
struct Collected {
  leaves: Vec<LeafState>,
  failures: Vec<NodeFailure>,
  executed: Vec<String>,
}

impl Collected {
  fn visit(&mut self, branch: Branch) {
    match branch {
      Branch::Completed {
        node_id,
        state,
        children,
      } => {
        self.executed.push(node_id.clone());
        if !children.iter().any(|c| matches!(c, Branch::Completed { .. })) {
          self.leaves.push(LeafState { node_id, state });
        }
        for child in children {
          self.visit(child);
        }
      }
      Branch::Failed(failure) => {
        self.executed.push(failure.node_id.clone());
        self.failures.push(failure);
      }
      Branch::Cancelled => {}
    }
  }
}

/// Flatten a finished walk into a report.
///
/// The final state merges every leaf state in tree order, so on key
/// collisions the later branch wins. With no completed node it is the seed.
fn aggregate(ctx: &RunContext, branch: Branch, seed: ExecutionState) -> RunReport {
  let mut collected = Collected::default();
  collected.visit(branch);

  let state = if collected.leaves.is_empty() {
    seed
  } else {
    collected
      .leaves
      .iter()
      .fold(ExecutionState::new(), |acc, leaf| {
        acc.merge(&StateDelta::from(leaf.state.as_map().clone()))
      })
  };

  RunReport {
    execution_id: ctx.execution_id.clone(),
    workflow_id: ctx.workflow_id.clone(),
    state,
    leaves: collected.leaves,
    failures: collected.failures,
    executed: collected.executed,
  }
}
