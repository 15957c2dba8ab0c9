use agentflow_behavior::{Behavior, BehaviorError, BehaviorInput, StateDelta};
use agentflow_config::{StepType, TriggerKind};
use async_trait::async_trait;
use serde_json::Value;

/// Root of workflows invoked through the API.
///
/// Config may list payload keys that must be present:
/// `{"required": ["topic"]}`.
#[derive(Debug, Default)]
pub struct ApiTrigger;

#[async_trait]
impl Behavior for ApiTrigger {
  fn id(&self) -> &str {
    "api"
  }

  fn step_type(&self) -> StepType {
    StepType::Trigger
  }

  fn trigger_kind(&self) -> Option<TriggerKind> {
    Some(TriggerKind::Api)
  }

  async fn execute(&self, input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError> {
    let Some(required) = input.config.get("required") else {
      return Ok(StateDelta::new());
    };
    let Some(keys) = required.as_array() else {
      return Err(BehaviorError::InvalidConfig(
        "'required' must be an array of keys".to_string(),
      ));
    };

    for key in keys {
      let key = key.as_str().ok_or_else(|| {
        BehaviorError::InvalidConfig("'required' must be an array of keys".to_string())
      })?;
      if matches!(input.state.get(key), None | Some(Value::Null)) {
        return Err(BehaviorError::MissingState {
          key: key.to_string(),
        });
      }
    }

    Ok(StateDelta::new())
  }
}

/// Root of workflows fired by the scheduler.
///
/// `intervalHours` in its config is read by the scheduler, not at run time.
#[derive(Debug, Default)]
pub struct ScheduleTrigger;

#[async_trait]
impl Behavior for ScheduleTrigger {
  fn id(&self) -> &str {
    "schedule"
  }

  fn step_type(&self) -> StepType {
    StepType::Trigger
  }

  fn trigger_kind(&self) -> Option<TriggerKind> {
    Some(TriggerKind::Schedule)
  }

  async fn execute(&self, _input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError> {
    Ok(StateDelta::new())
  }
}
