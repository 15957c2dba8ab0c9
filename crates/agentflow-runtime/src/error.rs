//! Runtime error types.

use std::time::Duration;

use agentflow_behavior::RegistryError;
use agentflow_workflow::WorkflowError;

/// Errors that end a run.
///
/// Configuration errors are returned before any behavior executes. Per-node
/// failures under the default policy are not errors; they are recorded in the
/// run report.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// No definition with this id.
  #[error("workflow not found: {workflow_id}")]
  WorkflowNotFound { workflow_id: String },

  /// The definition store failed.
  #[error("failed to load workflow '{workflow_id}': {source}")]
  Store {
    workflow_id: String,
    #[source]
    source: agentflow_store::Error,
  },

  /// The steps do not form a valid tree.
  #[error("invalid workflow: {0}")]
  Workflow(#[from] WorkflowError),

  /// A step references a behavior id nobody registered.
  #[error("unknown behavior '{behavior_id}'")]
  UnknownBehavior { behavior_id: String },

  /// Any other behavior resolution failure.
  #[error("behavior resolution failed: {0}")]
  Registry(RegistryError),

  /// The seed payload is unusable.
  #[error("invalid payload: {message}")]
  InvalidPayload { message: String },

  /// A step failed and the run's policy aborts on failure.
  #[error("node '{node_id}' failed: {message}")]
  NodeFailed { node_id: String, message: String },

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,

  /// The run did not finish before its deadline.
  #[error("execution exceeded deadline of {timeout:?}")]
  DeadlineExceeded { timeout: Duration },

  /// The run task went away without reporting a result.
  #[error("run ended without a result")]
  Interrupted,
}

impl From<RegistryError> for RuntimeError {
  fn from(e: RegistryError) -> Self {
    match e {
      RegistryError::UnknownBehavior { behavior_id } => RuntimeError::UnknownBehavior { behavior_id },
      other => RuntimeError::Registry(other),
    }
  }
}

impl RuntimeError {
  /// Whether the error was raised before any behavior executed.
  pub fn is_configuration(&self) -> bool {
    matches!(
      self,
      RuntimeError::WorkflowNotFound { .. }
        | RuntimeError::Workflow(_)
        | RuntimeError::UnknownBehavior { .. }
        | RuntimeError::Registry(_)
        | RuntimeError::InvalidPayload { .. }
    )
  }
}
