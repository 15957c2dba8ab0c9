//! Capabilities injected into behaviors.
//!
//! These are the boundaries to external services: language models,
//! media generation providers, social publishing and feed retrieval.
//! Network-backed implementations live in `agentflow-host-http`;
//! in-process ones live in [`crate::memory`].

use agentflow_artifact::ArtifactData;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::CapabilityError;

/// Natural-language model used for prompt enrichment and captions.
#[async_trait]
pub trait TextModel: Send + Sync {
  /// Ask the model for a JSON value shaped by `schema`.
  async fn invoke(
    &self,
    schema: &serde_json::Value,
    prompt: &str,
  ) -> Result<serde_json::Value, CapabilityError>;
}

/// Media returned by a generation provider.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedMedia {
  Url(String),
  Bytes { bytes: Bytes, content_type: String },
}

impl From<GeneratedMedia> for ArtifactData {
  fn from(media: GeneratedMedia) -> Self {
    match media {
      GeneratedMedia::Url(url) => ArtifactData::Url(url),
      GeneratedMedia::Bytes {
        bytes,
        content_type,
      } => ArtifactData::Bytes {
        bytes,
        content_type,
      },
    }
  }
}

/// Image/video generation provider.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
  /// Run `model_id` on `input`. Long-running jobs must stop when `cancel` fires.
  async fn generate(
    &self,
    model_id: &str,
    input: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<Vec<GeneratedMedia>, CapabilityError>;
}

/// A post sent to one social channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
  pub text: String,
  pub media_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
  pub post_id: String,
  #[serde(default)]
  pub url: Option<String>,
}

/// Social publishing.
#[async_trait]
pub trait Publisher: Send + Sync {
  async fn publish(
    &self,
    organization_id: &str,
    channel_id: &str,
    post: &Post,
  ) -> Result<PublishReceipt, CapabilityError>;
}

/// Retrieves raw feed documents.
#[async_trait]
pub trait FeedSource: Send + Sync {
  async fn fetch(&self, url: &str) -> Result<String, CapabilityError>;
}
