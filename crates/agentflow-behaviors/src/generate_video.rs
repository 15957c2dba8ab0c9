use std::sync::Arc;

use agentflow_artifact::{ArtifactKind, ArtifactSink};
use agentflow_behavior::{
  Behavior, BehaviorError, BehaviorInput, GenerationProvider, StateDelta,
};
use agentflow_config::StepType;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::generate::Generator;

/// Generates a video, animating the inherited `imageUrl` when there is one.
///
/// The prompt is `config.prompt`, else the inherited `imagePrompt`, else the
/// inherited `prompt`.
pub struct GenerateVideoBehavior {
  generator: Generator,
}

impl GenerateVideoBehavior {
  pub fn new(provider: Arc<dyn GenerationProvider>, artifacts: Arc<dyn ArtifactSink>) -> Self {
    Self {
      generator: Generator {
        provider,
        artifacts,
      },
    }
  }
}

#[async_trait]
impl Behavior for GenerateVideoBehavior {
  fn id(&self) -> &str {
    "generate-video"
  }

  fn step_type(&self) -> StepType {
    StepType::GenerateVideo
  }

  async fn execute(&self, input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError> {
    let prompt = input
      .optional_config_str("prompt")
      .or_else(|| input.state.get_str("imagePrompt"))
      .map(Ok)
      .unwrap_or_else(|| input.state_str("prompt"))?;

    let mut extra = Map::new();
    if let Some(image) = input.state.get_str("imageUrl") {
      extra.insert("image".to_string(), Value::String(image.to_string()));
    }

    let reference = self
      .generator
      .generate(&input, ArtifactKind::Video, prompt, extra)
      .await?;

    Ok(
      StateDelta::new()
        .with("videoUrl", reference.url)
        .with("videoPrompt", prompt),
    )
  }
}
