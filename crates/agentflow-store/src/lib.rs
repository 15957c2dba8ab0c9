//! Agentflow Store
//!
//! This crate provides workflow definition storage and the schedule timer
//! used by the owning service around runs.
//!
//! The [`DefinitionStore`] trait is read by the runtime once per run:
//! - Loading a workflow definition by id
//! - Saving and listing definitions (used by the CLI and scheduler setup)
//!
//! The [`Scheduler`] turns `schedule`-triggered workflows into
//! [`ScheduleMessage`]s on an mpsc channel at a fixed interval.

mod fs;
mod memory;
mod scheduler;

pub use fs::FsDefinitionStore;
pub use memory::MemoryDefinitionStore;
pub use scheduler::{ScheduleMessage, Scheduler};

use agentflow_config::WorkflowDef;
use async_trait::async_trait;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested workflow was not found.
  #[error("workflow not found: {0}")]
  NotFound(String),

  /// The workflow id cannot be used as a storage key.
  #[error("invalid workflow id: '{0}'")]
  InvalidId(String),

  /// A schedule was requested with an unusable interval.
  #[error("invalid schedule for '{workflow_id}': {message}")]
  InvalidSchedule {
    workflow_id: String,
    message: String,
  },

  /// A stored definition could not be parsed.
  #[error("failed to parse workflow '{workflow_id}': {source}")]
  Parse {
    workflow_id: String,
    #[source]
    source: serde_json::Error,
  },

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Storage trait for workflow definitions.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
  /// Load a workflow definition by id.
  async fn load_workflow(&self, workflow_id: &str) -> Result<WorkflowDef, Error>;

  /// Create or replace a workflow definition.
  async fn save_workflow(&self, workflow: &WorkflowDef) -> Result<(), Error>;

  /// All stored definitions, ordered by id.
  async fn list_workflows(&self) -> Result<Vec<WorkflowDef>, Error>;
}

/// Ids are used as file names, so they may not contain path syntax.
pub(crate) fn check_id(workflow_id: &str) -> Result<(), Error> {
  if workflow_id.is_empty()
    || workflow_id.starts_with('.')
    || workflow_id.contains(['/', '\\'])
  {
    return Err(Error::InvalidId(workflow_id.to_string()));
  }
  Ok(())
}
