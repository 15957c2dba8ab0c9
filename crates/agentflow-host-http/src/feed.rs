use agentflow_behavior::{CapabilityError, FeedSource};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{HttpPolicy, check_status, request_error};

/// Fetches feed documents over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
  client: Client,
  policy: HttpPolicy,
}

impl HttpFeedSource {
  pub fn new(client: Client, policy: HttpPolicy) -> Self {
    Self { client, policy }
  }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
  async fn fetch(&self, url: &str) -> Result<String, CapabilityError> {
    let url = self.policy.check(url)?;
    debug!(url = %url, "feed_fetch");

    let response = self
      .client
      .get(url)
      .header(
        reqwest::header::ACCEPT,
        "application/rss+xml, application/xml, text/xml",
      )
      .send()
      .await
      .map_err(request_error)?;

    check_status(response)
      .await?
      .text()
      .await
      .map_err(request_error)
  }
}
