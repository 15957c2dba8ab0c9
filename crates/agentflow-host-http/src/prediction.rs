use std::time::Duration;

use agentflow_behavior::{CapabilityError, GeneratedMedia, GenerationProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{check_status, request_error};

#[derive(Debug, Clone)]
pub struct PredictionConfig {
  pub base_url: String,
  pub api_token: Option<String>,
  /// Delay between status polls.
  pub poll_interval: Duration,
  /// Polls before giving up with [`CapabilityError::Timeout`].
  pub max_polls: u32,
}

impl PredictionConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      api_token: None,
      poll_interval: Duration::from_secs(2),
      max_polls: 300,
    }
  }
}

/// Generation provider for prediction-style APIs.
///
/// `POST {base}/predictions` creates a job; `GET {base}/predictions/{id}` is
/// polled until it reports `succeeded`, `failed` or `canceled`. Video models
/// routinely take minutes, so polling stops as soon as the run is cancelled.
#[derive(Debug, Clone)]
pub struct PredictionProvider {
  client: Client,
  config: PredictionConfig,
}

#[derive(Debug, Deserialize)]
struct Prediction {
  id: String,
  status: String,
  #[serde(default)]
  output: Value,
  #[serde(default)]
  error: Option<Value>,
}

impl PredictionProvider {
  pub fn new(client: Client, config: PredictionConfig) -> Self {
    Self { client, config }
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.config.api_token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn read(response: reqwest::Response) -> Result<Prediction, CapabilityError> {
    check_status(response)
      .await?
      .json()
      .await
      .map_err(|e| CapabilityError::InvalidResponse(e.to_string()))
  }
}

#[async_trait]
impl GenerationProvider for PredictionProvider {
  async fn generate(
    &self,
    model_id: &str,
    input: &Value,
    cancel: &CancellationToken,
  ) -> Result<Vec<GeneratedMedia>, CapabilityError> {
    let create = self
      .authorize(self.client.post(self.url("predictions")))
      .json(&json!({ "model": model_id, "input": input }));

    let mut prediction = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(CapabilityError::Cancelled),
      response = create.send() => Self::read(response.map_err(request_error)?).await?,
    };
    debug!(prediction_id = %prediction.id, model = %model_id, "prediction_created");

    let mut polls = 0;
    loop {
      match prediction.status.as_str() {
        "succeeded" => return media_from_output(&prediction.output),
        "failed" | "canceled" => {
          let message = prediction
            .error
            .map(|e| e.to_string())
            .unwrap_or_else(|| prediction.status.clone());
          return Err(CapabilityError::Request(format!(
            "prediction {} {}: {}",
            prediction.id, prediction.status, message
          )));
        }
        _ => {}
      }

      if polls >= self.config.max_polls {
        warn!(prediction_id = %prediction.id, polls, "prediction_poll_limit");
        return Err(CapabilityError::Timeout(format!(
          "prediction {} still {} after {} polls",
          prediction.id, prediction.status, polls
        )));
      }
      polls += 1;

      let poll = self
        .authorize(self.client.get(self.url(&format!("predictions/{}", prediction.id))));

      prediction = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CapabilityError::Cancelled),
        response = async {
          tokio::time::sleep(self.config.poll_interval).await;
          poll.send().await
        } => Self::read(response.map_err(request_error)?).await?,
      };
    }
  }
}

/// Output is either a single URL or a list of URLs.
fn media_from_output(output: &Value) -> Result<Vec<GeneratedMedia>, CapabilityError> {
  let urls: Vec<String> = match output {
    Value::String(url) => vec![url.clone()],
    Value::Array(items) => items
      .iter()
      .filter_map(Value::as_str)
      .map(str::to_string)
      .collect(),
    _ => Vec::new(),
  };

  if urls.is_empty() {
    return Err(CapabilityError::InvalidResponse(format!(
      "prediction output has no media: {}",
      output
    )));
  }
  Ok(urls.into_iter().map(GeneratedMedia::Url).collect())
}
