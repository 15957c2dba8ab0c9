//! In-process capability implementations.
//!
//! Used for offline runs and tests. None of these touch the network.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::capability::{
  FeedSource, GeneratedMedia, GenerationProvider, Post, PublishReceipt, Publisher, TextModel,
};
use crate::error::CapabilityError;

/// Text model that answers every request with the same value.
///
/// Prompts are recorded so callers can inspect what was asked.
#[derive(Debug)]
pub struct StaticTextModel {
  response: Value,
  prompts: Mutex<Vec<String>>,
}

impl StaticTextModel {
  pub fn new(response: Value) -> Self {
    Self {
      response,
      prompts: Mutex::new(Vec::new()),
    }
  }

  pub fn prompts(&self) -> Vec<String> {
    self
      .prompts
      .lock()
      .map(|p| p.clone())
      .unwrap_or_default()
  }
}

impl Default for StaticTextModel {
  fn default() -> Self {
    Self::new(Value::Object(serde_json::Map::new()))
  }
}

#[async_trait]
impl TextModel for StaticTextModel {
  async fn invoke(&self, _schema: &Value, prompt: &str) -> Result<Value, CapabilityError> {
    if let Ok(mut prompts) = self.prompts.lock() {
      prompts.push(prompt.to_string());
    }
    Ok(self.response.clone())
  }
}

/// Publisher that records posts instead of sending them.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
  posts: Mutex<Vec<PublishedPost>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedPost {
  pub organization_id: String,
  pub channel_id: String,
  pub post: Post,
}

impl MemoryPublisher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn posts(&self) -> Vec<PublishedPost> {
    self.posts.lock().map(|p| p.clone()).unwrap_or_default()
  }
}

#[async_trait]
impl Publisher for MemoryPublisher {
  async fn publish(
    &self,
    organization_id: &str,
    channel_id: &str,
    post: &Post,
  ) -> Result<PublishReceipt, CapabilityError> {
    let mut posts = self
      .posts
      .lock()
      .map_err(|_| CapabilityError::Request("publisher poisoned".to_string()))?;
    posts.push(PublishedPost {
      organization_id: organization_id.to_string(),
      channel_id: channel_id.to_string(),
      post: post.clone(),
    });
    Ok(PublishReceipt {
      post_id: format!("{}-{}", channel_id, posts.len()),
      url: None,
    })
  }
}

/// Feed source serving fixed documents by URL.
#[derive(Debug, Default)]
pub struct StaticFeedSource {
  documents: HashMap<String, String>,
}

impl StaticFeedSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_document(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
    self.documents.insert(url.into(), body.into());
    self
  }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
  async fn fetch(&self, url: &str) -> Result<String, CapabilityError> {
    self
      .documents
      .get(url)
      .cloned()
      .ok_or_else(|| CapabilityError::Status {
        status: 404,
        message: format!("no document for {}", url),
      })
  }
}

/// Generation provider returning a deterministic URL per model.
///
/// The URL is `{base_url}/{model_id}/{n}.{extension}` where `n` counts calls.
#[derive(Debug)]
pub struct StaticGenerationProvider {
  base_url: String,
  extension: String,
  calls: Mutex<Vec<(String, Value)>>,
}

impl StaticGenerationProvider {
  pub fn new(base_url: impl Into<String>, extension: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      extension: extension.into(),
      calls: Mutex::new(Vec::new()),
    }
  }

  /// Recorded `(model_id, input)` pairs.
  pub fn calls(&self) -> Vec<(String, Value)> {
    self.calls.lock().map(|c| c.clone()).unwrap_or_default()
  }
}

#[async_trait]
impl GenerationProvider for StaticGenerationProvider {
  async fn generate(
    &self,
    model_id: &str,
    input: &Value,
    cancel: &CancellationToken,
  ) -> Result<Vec<GeneratedMedia>, CapabilityError> {
    if cancel.is_cancelled() {
      return Err(CapabilityError::Cancelled);
    }
    let mut calls = self
      .calls
      .lock()
      .map_err(|_| CapabilityError::Request("provider poisoned".to_string()))?;
    calls.push((model_id.to_string(), input.clone()));
    Ok(vec![GeneratedMedia::Url(format!(
      "{}/{}/{}.{}",
      self.base_url,
      model_id,
      calls.len(),
      self.extension
    ))])
  }
}
