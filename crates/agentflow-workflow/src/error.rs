use agentflow_config::StepType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("workflow has no parentless step")]
  NoRoot,

  #[error("workflow has multiple parentless steps: {step_ids:?}")]
  MultipleRoots { step_ids: Vec<String> },

  #[error("duplicate step id: {0}")]
  DuplicateStep(String),

  #[error("steps not reachable from the root: {step_ids:?}")]
  UnreachableSteps { step_ids: Vec<String> },

  #[error("step '{step_id}' is part of a parent cycle")]
  Cycle { step_id: String },

  #[error("step '{step_id}' ({step_type}) violates tree structure: {message}")]
  StructuralViolation {
    step_id: String,
    step_type: StepType,
    message: String,
  },
}
