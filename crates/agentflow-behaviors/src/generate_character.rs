use std::sync::Arc;

use agentflow_artifact::{ArtifactKind, ArtifactSink};
use agentflow_behavior::{
  Behavior, BehaviorError, BehaviorInput, GenerationProvider, StateDelta,
};
use agentflow_config::StepType;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::generate::{Generator, rewrite_prompt};

/// Generates an image of a recurring character placed in the inherited scene.
///
/// The text model always writes the final prompt from `character` and the
/// inherited `prompt`. `referenceImageUrl`, when set, is sent to the provider
/// as `image` to keep the character consistent.
pub struct GenerateCharacterBehavior {
  generator: Generator,
}

impl GenerateCharacterBehavior {
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
impl Behavior for GenerateCharacterBehavior {
  fn id(&self) -> &str {
    "generate-character"
  }

  fn step_type(&self) -> StepType {
    StepType::GenerateImage
  }

  async fn execute(&self, input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError> {
    let character = input.config_str("character")?;
    let scene = input.state_str("prompt")?;

    let prompt = rewrite_prompt(
      &input,
      &format!(
        "Write one image generation prompt that shows this character:\n{character}\n\nin this scene:\n{scene}"
      ),
    )
    .await?;

    let mut extra = Map::new();
    if let Some(reference) = input.optional_config_str("referenceImageUrl") {
      extra.insert("image".to_string(), Value::String(reference.to_string()));
    }

    let reference = self
      .generator
      .generate(&input, ArtifactKind::Image, &prompt, extra)
      .await?;

    Ok(
      StateDelta::new()
        .with("imageUrl", reference.url)
        .with("imagePrompt", prompt)
        .with("character", character),
    )
  }
}
