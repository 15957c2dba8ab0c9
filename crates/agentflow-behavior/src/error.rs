use agentflow_config::StepType;

/// Errors raised by capability implementations (model, provider, publisher, feed).
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
  /// Transport-level failure.
  #[error("request failed: {0}")]
  Request(String),

  /// Upstream answered with a non-success status.
  #[error("upstream returned status {status}: {message}")]
  Status { status: u16, message: String },

  /// Upstream answered with something that could not be interpreted.
  #[error("invalid response: {0}")]
  InvalidResponse(String),

  /// The request target is not allowed by policy.
  #[error("denied: {0}")]
  Denied(String),

  /// A long-running upstream job did not finish in time.
  #[error("timed out: {0}")]
  Timeout(String),

  #[error("cancelled")]
  Cancelled,
}

/// Errors raised while executing a single behavior.
#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
  /// The step config is missing a key or has the wrong shape.
  #[error("invalid config: {0}")]
  InvalidConfig(String),

  /// A state key the behavior depends on was not produced upstream.
  #[error("missing state key '{key}'")]
  MissingState { key: String },

  /// A config template failed to render.
  #[error("failed to render config '{key}': {message}")]
  Template { key: String, message: String },

  #[error("capability error: {0}")]
  Capability(#[from] CapabilityError),

  #[error("artifact error: {0}")]
  Artifact(#[from] agentflow_artifact::Error),

  #[error("cancelled")]
  Cancelled,

  #[error("{0}")]
  Failed(String),
}

/// Errors raised while building or querying the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
  #[error("behavior '{0}' registered more than once")]
  DuplicateBehavior(String),

  #[error("unknown behavior '{behavior_id}'")]
  UnknownBehavior { behavior_id: String },

  /// A step references a behavior built for a different step type.
  #[error(
    "step '{step_id}' is {step_type} but behavior '{behavior_id}' handles {behavior_type}"
  )]
  StepTypeMismatch {
    step_id: String,
    behavior_id: String,
    step_type: StepType,
    behavior_type: StepType,
  },
}
