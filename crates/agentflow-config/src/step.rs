use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of work a step performs.
///
/// The type constrains where a step may sit in the tree; see
/// [`StepType::required_ancestors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
  Trigger,
  ThirdParty,
  GenerateImage,
  GenerateVideo,
  Publish,
}

impl StepType {
  /// Step types of which at least one must appear among the ancestors.
  ///
  /// An empty slice means the step has no ancestor requirement.
  pub fn required_ancestors(self) -> &'static [StepType] {
    match self {
      StepType::Trigger => &[],
      StepType::ThirdParty => &[StepType::Trigger],
      StepType::GenerateImage => &[StepType::Trigger, StepType::ThirdParty],
      StepType::GenerateVideo => &[
        StepType::Trigger,
        StepType::ThirdParty,
        StepType::GenerateImage,
      ],
      StepType::Publish => &[StepType::GenerateImage, StepType::GenerateVideo],
    }
  }
}

impl fmt::Display for StepType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      StepType::Trigger => "trigger",
      StepType::ThirdParty => "third_party",
      StepType::GenerateImage => "generate_image",
      StepType::GenerateVideo => "generate_video",
      StepType::Publish => "publish",
    };
    f.write_str(name)
  }
}

/// One persisted step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
  pub id: String,
  #[serde(rename = "type")]
  pub step_type: StepType,
  /// Identifier of the behavior that executes this step, e.g. "rss-feed".
  pub behavior_id: String,
  /// Step-specific configuration, opaque to the engine.
  #[serde(default = "empty_config")]
  pub config: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_id: Option<String>,
}

fn empty_config() -> serde_json::Value {
  serde_json::Value::Object(serde_json::Map::new())
}

impl Step {
  /// Create a step with an empty config.
  pub fn new(
    id: impl Into<String>,
    step_type: StepType,
    behavior_id: impl Into<String>,
    parent_id: Option<&str>,
  ) -> Self {
    Self {
      id: id.into(),
      step_type,
      behavior_id: behavior_id.into(),
      config: empty_config(),
      parent_id: parent_id.map(str::to_string),
    }
  }

  /// Replace the step config.
  pub fn with_config(mut self, config: serde_json::Value) -> Self {
    self.config = config;
    self
  }

  pub fn is_root(&self) -> bool {
    self.parent_id.is_none()
  }
}
