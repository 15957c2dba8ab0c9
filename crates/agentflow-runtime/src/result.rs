//! Run result types.

use agentflow_behavior::ExecutionState;
use agentflow_config::TriggerKind;
use serde::Serialize;

/// Outcome of a run that did not end in a [`crate::RuntimeError`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
  /// The tree was walked. Individual nodes may still have failed.
  Completed(RunReport),
  /// Nothing ran.
  Skipped(SkipReason),
}

impl RunResult {
  pub fn is_skipped(&self) -> bool {
    matches!(self, RunResult::Skipped(_))
  }

  pub fn report(&self) -> Option<&RunReport> {
    match self {
      RunResult::Completed(report) => Some(report),
      RunResult::Skipped(_) => None,
    }
  }

  pub fn into_report(self) -> Option<RunReport> {
    match self {
      RunResult::Completed(report) => Some(report),
      RunResult::Skipped(_) => None,
    }
  }
}

/// Why a run was a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
  Inactive,
  TriggerKindMismatch {
    expected: TriggerKind,
    actual: TriggerKind,
  },
}

/// Aggregated result of a walked tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
  pub execution_id: String,
  pub workflow_id: String,
  /// Leaf states merged in tree order.
  pub state: ExecutionState,
  /// The deepest completed state of every branch, in tree order.
  pub leaves: Vec<LeafState>,
  pub failures: Vec<NodeFailure>,
  /// Nodes whose behavior ran (completed or failed), in tree order.
  pub executed: Vec<String>,
}

impl RunReport {
  pub fn is_success(&self) -> bool {
    self.failures.is_empty()
  }

  pub fn failure(&self, node_id: &str) -> Option<&NodeFailure> {
    self.failures.iter().find(|f| f.node_id == node_id)
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafState {
  pub node_id: String,
  pub state: ExecutionState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFailure {
  pub node_id: String,
  pub behavior_id: String,
  pub error: String,
}
