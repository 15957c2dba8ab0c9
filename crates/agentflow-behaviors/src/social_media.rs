use std::sync::Arc;

use agentflow_behavior::{
  Behavior, BehaviorError, BehaviorInput, CapabilityError, Post, Publisher, StateDelta,
};
use agentflow_config::StepType;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Value, json};
use tracing::info;

/// Publishes the generated media to every configured channel.
///
/// Config:
/// - `channels` (required): non-empty list of channel ids
/// - `caption`: post text, usually a template such as `"{{ prompt }}"`
/// - `writeCaption`: have the text model write the caption instead
///
/// Without either, the inherited `prompt` is used as the text. Returns an
/// empty delta.
pub struct SocialMediaBehavior {
  publisher: Arc<dyn Publisher>,
}

impl SocialMediaBehavior {
  pub fn new(publisher: Arc<dyn Publisher>) -> Self {
    Self { publisher }
  }
}

#[async_trait]
impl Behavior for SocialMediaBehavior {
  fn id(&self) -> &str {
    "social-media"
  }

  fn step_type(&self) -> StepType {
    StepType::Publish
  }

  async fn execute(&self, input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError> {
    let channels = channels(input.config)?;

    let media_urls: Vec<String> = ["videoUrl", "imageUrl"]
      .iter()
      .filter_map(|key| input.state.get_str(key))
      .map(str::to_string)
      .collect();
    if media_urls.is_empty() {
      return Err(BehaviorError::MissingState {
        key: "imageUrl".to_string(),
      });
    }

    let post = Post {
      text: caption(&input).await?,
      media_urls,
    };

    let receipts = try_join_all(channels.iter().map(|channel| {
      self
        .publisher
        .publish(input.organization_id, channel, &post)
    }))
    .await?;

    for (channel, receipt) in channels.iter().zip(&receipts) {
      info!(
        node_id = input.node_id,
        channel_id = %channel,
        post_id = %receipt.post_id,
        "post_published"
      );
    }

    Ok(StateDelta::new())
  }
}

fn channels(config: &Value) -> Result<Vec<&str>, BehaviorError> {
  let invalid = || BehaviorError::InvalidConfig("'channels' must be a non-empty list of ids".to_string());

  let channels = config
    .get("channels")
    .and_then(Value::as_array)
    .ok_or_else(invalid)?
    .iter()
    .map(|c| c.as_str().filter(|s| !s.is_empty()).ok_or_else(invalid))
    .collect::<Result<Vec<_>, _>>()?;

  if channels.is_empty() {
    return Err(invalid());
  }
  Ok(channels)
}

async fn caption(input: &BehaviorInput<'_>) -> Result<String, BehaviorError> {
  if let Some(caption) = input.optional_config_str("caption") {
    return Ok(caption.to_string());
  }

  let subject = input
    .state
    .get_str("imagePrompt")
    .or_else(|| input.state.get_str("prompt"))
    .unwrap_or_default();

  if !input.config_bool("writeCaption") {
    return Ok(input.state.get_str("prompt").unwrap_or(subject).to_string());
  }

  let schema = json!({
    "type": "object",
    "properties": { "caption": { "type": "string" } },
    "required": ["caption"]
  });
  let response = input
    .text_model
    .invoke(
      &schema,
      &format!("Write a short, engaging social media caption for a post about:\n{subject}"),
    )
    .await?;

  response
    .get("caption")
    .and_then(Value::as_str)
    .map(str::to_string)
    .ok_or_else(|| {
      CapabilityError::InvalidResponse("text model returned no 'caption'".to_string()).into()
    })
}
