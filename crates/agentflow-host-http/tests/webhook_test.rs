mod common;

use agentflow_behavior::{CapabilityError, Post, PublishReceipt, Publisher};
use agentflow_host_http::WebhookPublisher;
use common::{FakeServer, Reply};
use serde_json::json;

fn post() -> Post {
  Post {
    text: "Comet visible tonight".to_string(),
    media_urls: vec!["https://cdn/a.png".to_string()],
  }
}

#[tokio::test]
async fn test_publish_posts_json_and_reads_receipt() {
  let server = FakeServer::start(vec![Reply::ok(
    json!({ "postId": "ig-1", "url": "https://social/ig-1" }),
  )])
  .await;
  let publisher = WebhookPublisher::new(reqwest::Client::new(), format!("{}/hooks/posts", server.base_url));

  let receipt = publisher.publish("org-1", "instagram", &post()).await.unwrap();

  assert_eq!(
    receipt,
    PublishReceipt {
      post_id: "ig-1".to_string(),
      url: Some("https://social/ig-1".to_string()),
    }
  );

  let requests = server.requests();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].method, "POST");
  assert_eq!(requests[0].path, "/hooks/posts");
  assert_eq!(
    requests[0].body,
    json!({
      "organizationId": "org-1",
      "channelId": "instagram",
      "text": "Comet visible tonight",
      "mediaUrls": ["https://cdn/a.png"]
    })
  );
}

#[tokio::test]
async fn test_publish_surfaces_upstream_status() {
  let server = FakeServer::start(vec![Reply::status(503, json!({ "error": "down" }))]).await;
  let publisher = WebhookPublisher::new(reqwest::Client::new(), server.base_url.clone());

  let result = publisher.publish("org-1", "instagram", &post()).await;

  assert!(matches!(result, Err(CapabilityError::Status { status: 503, .. })));
}
