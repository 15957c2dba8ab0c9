mod common;

use std::time::Duration;

use agentflow_behavior::{CapabilityError, GeneratedMedia, GenerationProvider};
use agentflow_host_http::{PredictionConfig, PredictionProvider};
use common::{FakeServer, Reply};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn provider(server: &FakeServer, max_polls: u32) -> PredictionProvider {
  let mut config = PredictionConfig::new(server.base_url.clone());
  config.api_token = Some("secret".to_string());
  config.poll_interval = Duration::ZERO;
  config.max_polls = max_polls;
  PredictionProvider::new(reqwest::Client::new(), config)
}

#[tokio::test]
async fn test_polls_until_succeeded() {
  let server = FakeServer::start(vec![
    Reply::status(201, json!({ "id": "p1", "status": "starting" })),
    Reply::ok(json!({ "id": "p1", "status": "processing" })),
    Reply::ok(json!({ "id": "p1", "status": "succeeded", "output": ["https://cdn/a.png"] })),
  ])
  .await;

  let media = provider(&server, 10)
    .generate("flux", &json!({ "prompt": "comet" }), &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(media, vec![GeneratedMedia::Url("https://cdn/a.png".to_string())]);

  let requests = server.requests();
  assert_eq!(requests.len(), 3);
  assert_eq!(requests[0].method, "POST");
  assert_eq!(requests[0].path, "/predictions");
  assert_eq!(
    requests[0].body,
    json!({ "model": "flux", "input": { "prompt": "comet" } })
  );
  for poll in &requests[1..] {
    assert_eq!(poll.method, "GET");
    assert_eq!(poll.path, "/predictions/p1");
  }
  assert!(requests.iter().all(|r| r.authorization.as_deref() == Some("Bearer secret")));
}

#[tokio::test]
async fn test_failed_prediction_reports_its_error() {
  let server = FakeServer::start(vec![
    Reply::ok(json!({ "id": "p2", "status": "processing" })),
    Reply::ok(json!({ "id": "p2", "status": "failed", "error": "nsfw content detected" })),
  ])
  .await;

  let result = provider(&server, 10)
    .generate("flux", &json!({}), &CancellationToken::new())
    .await;

  match result {
    Err(CapabilityError::Request(message)) => {
      assert!(message.contains("p2 failed"), "{}", message);
      assert!(message.contains("nsfw content detected"), "{}", message);
    }
    other => panic!("expected request error, got {:?}", other),
  }
  assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_canceled_prediction_is_an_error_without_polling() {
  let server = FakeServer::start(vec![Reply::ok(json!({ "id": "p3", "status": "canceled" }))]).await;

  let result = provider(&server, 10)
    .generate("flux", &json!({}), &CancellationToken::new())
    .await;

  assert!(matches!(result, Err(CapabilityError::Request(m)) if m.contains("canceled")));
  assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_poll_limit_times_out() {
  let processing = || Reply::ok(json!({ "id": "p4", "status": "processing" }));
  let server = FakeServer::start(vec![processing(), processing(), processing()]).await;

  let result = provider(&server, 2)
    .generate("flux", &json!({}), &CancellationToken::new())
    .await;

  assert!(matches!(result, Err(CapabilityError::Timeout(_))));
  // One create plus `max_polls` status reads
  assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn test_cancel_while_polling() {
  // The first status read never gets an answer
  let server = FakeServer::start(vec![Reply::ok(json!({ "id": "p5", "status": "starting" }))]).await;
  let provider = provider(&server, 10);
  let cancel = CancellationToken::new();

  let task = {
    let cancel = cancel.clone();
    tokio::spawn(async move { provider.generate("flux", &json!({}), &cancel).await })
  };

  server.wait_for_requests(2).await;
  cancel.cancel();

  let result = tokio::time::timeout(Duration::from_secs(5), task)
    .await
    .unwrap()
    .unwrap();
  assert!(matches!(result, Err(CapabilityError::Cancelled)));
  assert_eq!(server.requests()[1].path, "/predictions/p5");
}

#[tokio::test]
async fn test_create_rejected_with_status() {
  let server = FakeServer::start(vec![Reply::status(422, json!({ "detail": "unknown model" }))]).await;

  let result = provider(&server, 10)
    .generate("nope", &json!({}), &CancellationToken::new())
    .await;

  match result {
    Err(CapabilityError::Status { status, message }) => {
      assert_eq!(status, 422);
      assert!(message.contains("unknown model"));
    }
    other => panic!("expected status error, got {:?}", other),
  }
}
