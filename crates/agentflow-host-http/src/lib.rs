//! Agentflow HTTP host
//!
//! reqwest-backed implementations of the capabilities behaviors call:
//! feed retrieval, an OpenAI-compatible text model, a prediction-style
//! generation provider and a webhook publisher. Every outbound URL taken
//! from step config goes through an [`HttpPolicy`] first.

mod feed;
mod policy;
mod prediction;
mod text_model;
mod webhook;

pub use feed::HttpFeedSource;
pub use policy::HttpPolicy;
pub use prediction::{PredictionConfig, PredictionProvider};
pub use text_model::{
  DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, OpenAiConfig, OpenAiTextModel,
};
pub use webhook::WebhookPublisher;

use agentflow_behavior::CapabilityError;

pub(crate) fn request_error(e: reqwest::Error) -> CapabilityError {
  if e.is_timeout() {
    CapabilityError::Timeout(e.to_string())
  } else {
    CapabilityError::Request(e.to_string())
  }
}

/// Turn a non-success response into [`CapabilityError::Status`].
pub(crate) async fn check_status(
  response: reqwest::Response,
) -> Result<reqwest::Response, CapabilityError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let message = response.text().await.unwrap_or_default();
  Err(CapabilityError::Status {
    status: status.as_u16(),
    message,
  })
}
