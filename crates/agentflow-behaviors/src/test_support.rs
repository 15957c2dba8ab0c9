use agentflow_behavior::memory::StaticTextModel;
use agentflow_behavior::{BehaviorInput, ExecutionState};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub const FEED: &str = r#"<rss version="2.0"><channel>
  <title>Example News</title>
  <item>
    <title>Comet visible tonight</title>
    <link>https://x/comet</link>
    <description>Look north after sunset.</description>
  </item>
</channel></rss>"#;

/// Owns everything a [`BehaviorInput`] borrows.
pub struct Harness {
  pub config: Value,
  pub state: ExecutionState,
  pub model: StaticTextModel,
  pub cancel: CancellationToken,
}

impl Harness {
  pub fn new(config: Value, state: Value) -> Self {
    Self {
      config,
      state: ExecutionState::from_payload(state).unwrap(),
      model: StaticTextModel::default(),
      cancel: CancellationToken::new(),
    }
  }

  pub fn with_model(mut self, model: StaticTextModel) -> Self {
    self.model = model;
    self
  }

  pub fn input(&self) -> BehaviorInput<'_> {
    BehaviorInput {
      node_id: "node",
      execution_id: "exec-1",
      organization_id: "org-1",
      config: &self.config,
      state: &self.state,
      text_model: &self.model,
      cancel: &self.cancel,
    }
  }
}
