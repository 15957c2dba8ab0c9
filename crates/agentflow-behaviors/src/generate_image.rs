use std::sync::Arc;

use agentflow_artifact::{ArtifactKind, ArtifactSink};
use agentflow_behavior::{
  Behavior, BehaviorError, BehaviorInput, GenerationProvider, StateDelta,
};
use agentflow_config::StepType;
use async_trait::async_trait;
use serde_json::Map;

use crate::generate::{Generator, rewrite_prompt};

/// Generates an image from the inherited `prompt`.
///
/// Config:
/// - `model` (required): provider model id
/// - `prompt`: overrides the inherited prompt
/// - `style`: appended to the prompt
/// - `enhance`: let the text model polish the prompt first
/// - `options`: passed through to the provider
pub struct GenerateImageBehavior {
  generator: Generator,
}

impl GenerateImageBehavior {
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
impl Behavior for GenerateImageBehavior {
  fn id(&self) -> &str {
    "generate-image"
  }

  fn step_type(&self) -> StepType {
    StepType::GenerateImage
  }

  async fn execute(&self, input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError> {
    let base = match input.optional_config_str("prompt") {
      Some(prompt) => prompt,
      None => input.state_str("prompt")?,
    };

    let mut prompt = match input.optional_config_str("style") {
      Some(style) => format!("{}, {}", base, style),
      None => base.to_string(),
    };
    if input.config_bool("enhance") {
      prompt = rewrite_prompt(
        &input,
        &format!("Improve this image generation prompt, keep it to one sentence:\n{prompt}"),
      )
      .await?;
    }

    let reference = self
      .generator
      .generate(&input, ArtifactKind::Image, &prompt, Map::new())
      .await?;

    Ok(
      StateDelta::new()
        .with("imageUrl", reference.url)
        .with("imagePrompt", prompt),
    )
  }
}
