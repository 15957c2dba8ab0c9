use agentflow_behavior::{CapabilityError, TextModel};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::{check_status, request_error};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAiConfig {
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      api_key: api_key.into(),
      base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
      model: DEFAULT_OPENAI_MODEL.to_string(),
    }
  }
}

/// Text model backed by an OpenAI-compatible chat completions endpoint.
///
/// The schema is passed in the system message and the response is requested
/// in JSON mode, so the first choice's content parses as the structured result.
#[derive(Debug, Clone)]
pub struct OpenAiTextModel {
  client: Client,
  config: OpenAiConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage<'a>>,
  response_format: Value,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
  #[serde(default)]
  content: Option<String>,
}

impl OpenAiTextModel {
  pub fn new(client: Client, config: OpenAiConfig) -> Self {
    Self { client, config }
  }
}

#[async_trait]
impl TextModel for OpenAiTextModel {
  async fn invoke(&self, schema: &Value, prompt: &str) -> Result<Value, CapabilityError> {
    let request = ChatRequest {
      model: &self.config.model,
      messages: vec![
        ChatMessage {
          role: "system",
          content: format!(
            "Respond only with a JSON object that matches this JSON schema: {}",
            schema
          ),
        },
        ChatMessage {
          role: "user",
          content: prompt.to_string(),
        },
      ],
      response_format: json!({ "type": "json_object" }),
    };

    debug!(model = %self.config.model, "text_model_invoke");

    let response = self
      .client
      .post(format!(
        "{}/chat/completions",
        self.config.base_url.trim_end_matches('/')
      ))
      .bearer_auth(&self.config.api_key)
      .json(&request)
      .send()
      .await
      .map_err(request_error)?;

    let body: ChatResponse = check_status(response)
      .await?
      .json()
      .await
      .map_err(|e| CapabilityError::InvalidResponse(e.to_string()))?;

    parse_reply(body)
  }
}

fn parse_reply(body: ChatResponse) -> Result<Value, CapabilityError> {
  let content = body
    .choices
    .into_iter()
    .next()
    .and_then(|choice| choice.message.content)
    .ok_or_else(|| CapabilityError::InvalidResponse("response has no content".to_string()))?;

  serde_json::from_str(&content)
    .map_err(|e| CapabilityError::InvalidResponse(format!("content is not JSON: {}", e)))
}
