use agentflow_behavior::{CapabilityError, Post, PublishReceipt, Publisher};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::{check_status, request_error};

/// Publishes posts by POSTing JSON to a webhook.
///
/// The webhook is expected to answer with a [`PublishReceipt`]
/// (`{"postId": "...", "url": "..."}`).
#[derive(Debug, Clone)]
pub struct WebhookPublisher {
  client: Client,
  url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookBody<'a> {
  organization_id: &'a str,
  channel_id: &'a str,
  #[serde(flatten)]
  post: &'a Post,
}

impl WebhookPublisher {
  pub fn new(client: Client, url: impl Into<String>) -> Self {
    Self {
      client,
      url: url.into(),
    }
  }
}

#[async_trait]
impl Publisher for WebhookPublisher {
  async fn publish(
    &self,
    organization_id: &str,
    channel_id: &str,
    post: &Post,
  ) -> Result<PublishReceipt, CapabilityError> {
    debug!(channel_id, "webhook_publish");

    let response = self
      .client
      .post(&self.url)
      .json(&WebhookBody {
        organization_id,
        channel_id,
        post,
      })
      .send()
      .await
      .map_err(request_error)?;

    check_status(response)
      .await?
      .json()
      .await
      .map_err(|e| CapabilityError::InvalidResponse(e.to_string()))
  }
}
