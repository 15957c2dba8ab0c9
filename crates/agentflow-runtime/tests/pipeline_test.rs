//! End-to-end run of the standard behaviors against in-memory services.

use std::sync::Arc;

use agentflow_artifact::MemoryArtifactSink;
use agentflow_behavior::memory::{
  MemoryPublisher, StaticFeedSource, StaticGenerationProvider, StaticTextModel,
};
use agentflow_behaviors::{BehaviorDeps, standard_registry};
use agentflow_config::{Step, StepType, TriggerKind, WorkflowDef};
use agentflow_runtime::{RunResult, Runtime, SkipReason};
use agentflow_store::MemoryDefinitionStore;
use serde_json::{Value, json};

const FEED_URL: &str = "https://news.example/feed.xml";

const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Example News</title>
  <item>
    <title>Comet visible tonight</title>
    <link>https://news.example/comet</link>
    <description><![CDATA[Look <b>north</b> after sunset.]]></description>
  </item>
  <item>
    <title>Older story</title>
    <link>https://news.example/old</link>
  </item>
</channel></rss>"#;

struct Services {
  publisher: Arc<MemoryPublisher>,
  artifacts: Arc<MemoryArtifactSink>,
  generator: Arc<StaticGenerationProvider>,
}

fn news_workflow() -> WorkflowDef {
  WorkflowDef {
    id: "daily-news".to_string(),
    organization_id: "org-1".to_string(),
    name: Some("Daily news".to_string()),
    active: true,
    steps: vec![
      Step::new("trigger", StepType::Trigger, "schedule", None)
        .with_config(json!({ "intervalHours": 24 })),
      Step::new("feed", StepType::ThirdParty, "rss-feed", Some("trigger"))
        .with_config(json!({ "url": FEED_URL })),
      Step::new("image", StepType::GenerateImage, "generate-image", Some("feed"))
        .with_config(json!({ "model": "flux" })),
      Step::new("post", StepType::Publish, "social-media", Some("image"))
        .with_config(json!({ "channels": ["instagram"] })),
    ],
  }
}

fn runtime() -> (Runtime, Services) {
  let services = Services {
    publisher: Arc::new(MemoryPublisher::new()),
    artifacts: Arc::new(MemoryArtifactSink::new()),
    generator: Arc::new(StaticGenerationProvider::new("https://cdn.example", "png")),
  };
  let deps = BehaviorDeps {
    feeds: Arc::new(StaticFeedSource::new().with_document(FEED_URL, FEED)),
    generator: services.generator.clone(),
    artifacts: services.artifacts.clone(),
    publisher: services.publisher.clone(),
  };

  let runtime = Runtime::new(
    Arc::new(MemoryDefinitionStore::with_workflows([news_workflow()])),
    Arc::new(standard_registry(&deps).unwrap()),
    Arc::new(StaticTextModel::default()),
  );
  (runtime, services)
}

#[tokio::test]
async fn test_schedule_feed_image_publish() {
  let (runtime, services) = runtime();

  let report = runtime
    .run_to_completion("daily-news", TriggerKind::Schedule, Value::Null)
    .await
    .unwrap()
    .into_report()
    .unwrap();

  assert!(report.is_success(), "failures: {:?}", report.failures);
  assert_eq!(report.executed, vec!["trigger", "feed", "image", "post"]);

  let mut keys: Vec<_> = report.state.keys().cloned().collect();
  keys.sort();
  assert_eq!(keys, vec!["imagePrompt", "imageUrl", "prompt", "sourceUrl"]);

  let prompt = report.state.get_str("prompt").unwrap();
  assert!(prompt.starts_with("Comet visible tonight"));
  assert_eq!(report.state.get_str("sourceUrl"), Some("https://news.example/comet"));
  assert_eq!(report.state.get_str("imagePrompt"), Some(prompt));

  let image_url = report.state.get_str("imageUrl").unwrap();
  assert_eq!(image_url, "https://cdn.example/flux/1.png");
  assert_eq!(services.generator.calls().len(), 1);
  assert_eq!(services.artifacts.saved().len(), 1);

  let posts = services.publisher.posts();
  assert_eq!(posts.len(), 1);
  assert_eq!(posts[0].organization_id, "org-1");
  assert_eq!(posts[0].channel_id, "instagram");
  assert_eq!(posts[0].post.media_urls, vec![image_url.to_string()]);
}

#[tokio::test]
async fn test_api_invocation_of_scheduled_workflow_is_skipped() {
  let (runtime, services) = runtime();

  let result = runtime
    .run_to_completion("daily-news", TriggerKind::Api, json!({}))
    .await
    .unwrap();

  assert!(matches!(
    result,
    RunResult::Skipped(SkipReason::TriggerKindMismatch { .. })
  ));
  assert!(services.publisher.posts().is_empty());
  assert!(services.generator.calls().is_empty());
}
