use std::sync::Arc;

use agentflow_artifact::{ArtifactDescriptor, ArtifactKind, ArtifactSink, StoredReference};
use agentflow_behavior::{BehaviorError, BehaviorInput, CapabilityError, GenerationProvider};
use serde_json::{Map, Value, json};
use tracing::debug;

/// Shared plumbing for the generation behaviors: call the provider, keep the
/// first media item and persist it through the artifact sink.
pub(crate) struct Generator {
  pub provider: Arc<dyn GenerationProvider>,
  pub artifacts: Arc<dyn ArtifactSink>,
}

impl Generator {
  pub async fn generate(
    &self,
    input: &BehaviorInput<'_>,
    kind: ArtifactKind,
    prompt: &str,
    extra: Map<String, Value>,
  ) -> Result<StoredReference, BehaviorError> {
    let model = input.config_str("model")?;

    let mut request = options(input)?;
    request.extend(extra);
    request.insert("prompt".to_string(), Value::String(prompt.to_string()));
    let request = Value::Object(request);

    let media = self
      .provider
      .generate(model, &request, input.cancel)
      .await?
      .into_iter()
      .next()
      .ok_or_else(|| {
        CapabilityError::InvalidResponse(format!("model '{}' returned no media", model))
      })?;

    let reference = self
      .artifacts
      .save(
        input.organization_id,
        ArtifactDescriptor {
          kind,
          data: media.into(),
          prompt: Some(prompt.to_string()),
          model: Some(model.to_string()),
        },
      )
      .await?;

    debug!(
      node_id = input.node_id,
      artifact_id = %reference.artifact_id,
      "artifact_generated"
    );
    Ok(reference)
  }
}

/// Provider-specific passthrough options from `config.options`.
fn options(input: &BehaviorInput<'_>) -> Result<Map<String, Value>, BehaviorError> {
  match input.config.get("options") {
    None | Some(Value::Null) => Ok(Map::new()),
    Some(Value::Object(map)) => Ok(map.clone()),
    Some(_) => Err(BehaviorError::InvalidConfig(
      "'options' must be an object".to_string(),
    )),
  }
}

/// Ask the text model to rewrite `prompt` following `instruction`.
pub(crate) async fn rewrite_prompt(
  input: &BehaviorInput<'_>,
  instruction: &str,
) -> Result<String, BehaviorError> {
  let schema = json!({
    "type": "object",
    "properties": { "prompt": { "type": "string" } },
    "required": ["prompt"]
  });

  let response = input.text_model.invoke(&schema, instruction).await?;
  response
    .get("prompt")
    .and_then(Value::as_str)
    .filter(|p| !p.trim().is_empty())
    .map(str::to_string)
    .ok_or_else(|| {
      CapabilityError::InvalidResponse("text model returned no 'prompt'".to_string()).into()
    })
}
