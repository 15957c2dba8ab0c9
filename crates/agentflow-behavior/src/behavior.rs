use agentflow_config::{StepType, TriggerKind};
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::capability::TextModel;
use crate::error::BehaviorError;
use crate::state::{ExecutionState, StateDelta};

/// Everything a behavior sees when it runs.
///
/// The state is borrowed immutably; a behavior communicates only through the
/// [`StateDelta`] it returns.
pub struct BehaviorInput<'a> {
  pub node_id: &'a str,
  pub execution_id: &'a str,
  pub organization_id: &'a str,
  /// Step config after template rendering.
  pub config: &'a Value,
  /// Merged state from the root down to this step's parent.
  pub state: &'a ExecutionState,
  pub text_model: &'a dyn TextModel,
  pub cancel: &'a CancellationToken,
}

impl<'a> BehaviorInput<'a> {
  /// Required string config value.
  pub fn config_str(&self, key: &str) -> Result<&'a str, BehaviorError> {
    self
      .optional_config_str(key)
      .ok_or_else(|| BehaviorError::InvalidConfig(format!("'{}' must be a string", key)))
  }

  pub fn optional_config_str(&self, key: &str) -> Option<&'a str> {
    self
      .config
      .get(key)
      .and_then(Value::as_str)
      .filter(|s| !s.is_empty())
  }

  pub fn config_bool(&self, key: &str) -> bool {
    self.config.get(key).and_then(Value::as_bool).unwrap_or(false)
  }

  /// Required string state value.
  pub fn state_str(&self, key: &str) -> Result<&'a str, BehaviorError> {
    self.state.get_str(key).ok_or_else(|| BehaviorError::MissingState {
      key: key.to_string(),
    })
  }
}

/// The unit of work bound to a step through its behavior id.
#[async_trait]
pub trait Behavior: Send + Sync {
  /// Identifier steps reference in `behaviorId`.
  fn id(&self) -> &str;

  /// The step type this behavior can run as.
  fn step_type(&self) -> StepType;

  /// For triggers, the invocation kind that activates the workflow.
  fn trigger_kind(&self) -> Option<TriggerKind> {
    None
  }

  async fn execute(&self, input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError>;
}
