use std::sync::Arc;

use agentflow_behavior::{Behavior, BehaviorError, BehaviorInput, FeedSource, StateDelta};
use agentflow_config::StepType;
use async_trait::async_trait;
use tracing::debug;

use crate::feed;
use crate::generate::rewrite_prompt;

/// Reads the first item of an RSS/Atom feed into `prompt` and `sourceUrl`.
///
/// Config:
/// - `url` (required): feed location
/// - `enrich`: rewrite the item into an image prompt with the text model
/// - `instructions`: extra guidance for the rewrite
pub struct RssFeedBehavior {
  feeds: Arc<dyn FeedSource>,
}

impl RssFeedBehavior {
  pub fn new(feeds: Arc<dyn FeedSource>) -> Self {
    Self { feeds }
  }
}

#[async_trait]
impl Behavior for RssFeedBehavior {
  fn id(&self) -> &str {
    "rss-feed"
  }

  fn step_type(&self) -> StepType {
    StepType::ThirdParty
  }

  async fn execute(&self, input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError> {
    let url = input.config_str("url")?;
    let document = self.feeds.fetch(url).await?;

    let item = feed::first_item(&document)
      .ok_or_else(|| BehaviorError::Failed(format!("feed '{}' has no items", url)))?;
    debug!(node_id = input.node_id, title = %item.title, "feed_item");

    let mut prompt = item.summary();
    if input.config_bool("enrich") {
      prompt = enrich(&input, &prompt).await?;
    }

    let source_url = item.link.unwrap_or_else(|| url.to_string());
    Ok(
      StateDelta::new()
        .with("prompt", prompt)
        .with("sourceUrl", source_url),
    )
  }
}

async fn enrich(input: &BehaviorInput<'_>, summary: &str) -> Result<String, BehaviorError> {
  let mut request =
    format!("Write one vivid image generation prompt inspired by this news item:\n{summary}");
  if let Some(instructions) = input.optional_config_str("instructions") {
    request.push_str("\n\nFollow these instructions: ");
    request.push_str(instructions);
  }
  rewrite_prompt(input, &request).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::{FEED, Harness};
  use agentflow_behavior::CapabilityError;
  use agentflow_behavior::memory::{StaticFeedSource, StaticTextModel};
  use serde_json::json;

  fn behavior() -> RssFeedBehavior {
    RssFeedBehavior::new(Arc::new(
      StaticFeedSource::new().with_document("https://x/feed.xml", FEED),
    ))
  }

  #[tokio::test]
  async fn test_first_item_becomes_prompt() {
    let harness = Harness::new(json!({ "url": "https://x/feed.xml" }), json!({}));
    let delta = behavior().execute(harness.input()).await.unwrap();

    assert_eq!(
      delta.get("prompt").unwrap(),
      "Comet visible tonight. Look north after sunset."
    );
    assert_eq!(delta.get("sourceUrl").unwrap(), "https://x/comet");
  }

  #[tokio::test]
  async fn test_enrich_uses_text_model() {
    let harness = Harness::new(
      json!({ "url": "https://x/feed.xml", "enrich": true, "instructions": "watercolor" }),
      json!({}),
    )
    .with_model(StaticTextModel::new(json!({ "prompt": "a watercolor comet" })));

    let delta = behavior().execute(harness.input()).await.unwrap();

    assert_eq!(delta.get("prompt").unwrap(), "a watercolor comet");
    let prompts = harness.model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Comet visible tonight"));
    assert!(prompts[0].contains("watercolor"));
  }

  #[tokio::test]
  async fn test_missing_url() {
    let harness = Harness::new(json!({}), json!({}));
    let err = behavior().execute(harness.input()).await.unwrap_err();
    assert!(matches!(err, BehaviorError::InvalidConfig(_)));
  }

  #[tokio::test]
  async fn test_fetch_failure_propagates() {
    let harness = Harness::new(json!({ "url": "https://y/feed.xml" }), json!({}));
    let err = behavior().execute(harness.input()).await.unwrap_err();
    assert!(matches!(
      err,
      BehaviorError::Capability(CapabilityError::Status { status: 404, .. })
    ));
  }
}
