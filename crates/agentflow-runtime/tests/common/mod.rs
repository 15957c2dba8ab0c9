//! Test behaviors and helpers shared by the runtime integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentflow_behavior::memory::StaticTextModel;
use agentflow_behavior::{Behavior, BehaviorError, BehaviorInput, BehaviorRegistry, StateDelta};
use agentflow_behaviors::{ApiTrigger, ScheduleTrigger};
use agentflow_config::{Step, StepType, WorkflowDef};
use agentflow_runtime::{Runtime, RuntimeConfig};
use agentflow_store::MemoryDefinitionStore;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

/// Records the state each node observed, in execution order.
#[derive(Debug, Default)]
pub struct Recorder {
  seen: Mutex<Vec<(String, Value)>>,
}

impl Recorder {
  pub fn seen(&self) -> Vec<(String, Value)> {
    self.seen.lock().unwrap().clone()
  }

  pub fn state_of(&self, node_id: &str) -> Option<Value> {
    self
      .seen()
      .into_iter()
      .find(|(id, _)| id == node_id)
      .map(|(_, state)| state)
  }

  pub fn is_empty(&self) -> bool {
    self.seen.lock().unwrap().is_empty()
  }
}

/// Writes the object under config `set` into the state.
pub struct WriteBehavior {
  pub id: &'static str,
  pub step_type: StepType,
  pub recorder: Arc<Recorder>,
}

#[async_trait]
impl Behavior for WriteBehavior {
  fn id(&self) -> &str {
    self.id
  }

  fn step_type(&self) -> StepType {
    self.step_type
  }

  async fn execute(&self, input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError> {
    self
      .recorder
      .seen
      .lock()
      .unwrap()
      .push((input.node_id.to_string(), input.state.to_value()));

    let mut delta = StateDelta::new();
    if let Some(Value::Object(set)) = input.config.get("set") {
      for (key, value) in set {
        delta.insert(key.clone(), value.clone());
      }
    }
    Ok(delta)
  }
}

pub struct FailBehavior;

#[async_trait]
impl Behavior for FailBehavior {
  fn id(&self) -> &str {
    "fail"
  }

  fn step_type(&self) -> StepType {
    StepType::ThirdParty
  }

  async fn execute(&self, _input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError> {
    Err(BehaviorError::Failed("feed unavailable".to_string()))
  }
}

pub struct PanicBehavior;

#[async_trait]
impl Behavior for PanicBehavior {
  fn id(&self) -> &str {
    "panic"
  }

  fn step_type(&self) -> StepType {
    StepType::ThirdParty
  }

  async fn execute(&self, _input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError> {
    panic!("kaboom");
  }
}

/// Signals when it starts and when its future is dropped mid-flight.
pub struct SlowBehavior {
  pub started: Arc<Notify>,
  pub dropped: Arc<Notify>,
}

struct NotifyOnDrop(Arc<Notify>);

impl Drop for NotifyOnDrop {
  fn drop(&mut self) {
    self.0.notify_one();
  }
}

#[async_trait]
impl Behavior for SlowBehavior {
  fn id(&self) -> &str {
    "slow"
  }

  fn step_type(&self) -> StepType {
    StepType::ThirdParty
  }

  async fn execute(&self, _input: BehaviorInput<'_>) -> Result<StateDelta, BehaviorError> {
    let guard = NotifyOnDrop(self.dropped.clone());
    self.started.notify_one();
    tokio::time::sleep(Duration::from_secs(3600)).await;
    std::mem::forget(guard);
    Ok(StateDelta::new().with("slow", true))
  }
}

pub struct Fixture {
  pub recorder: Arc<Recorder>,
  pub started: Arc<Notify>,
  pub dropped: Arc<Notify>,
  pub registry: BehaviorRegistry,
}

impl Fixture {
  pub fn new() -> Self {
    let recorder = Arc::new(Recorder::default());
    let started = Arc::new(Notify::new());
    let dropped = Arc::new(Notify::new());

    let registry = BehaviorRegistry::builder()
      .register(ApiTrigger)
      .register(ScheduleTrigger)
      .register(WriteBehavior {
        id: "write",
        step_type: StepType::ThirdParty,
        recorder: recorder.clone(),
      })
      .register(WriteBehavior {
        id: "write-image",
        step_type: StepType::GenerateImage,
        recorder: recorder.clone(),
      })
      .register(FailBehavior)
      .register(PanicBehavior)
      .register(SlowBehavior {
        started: started.clone(),
        dropped: dropped.clone(),
      })
      .build()
      .unwrap();

    Self {
      recorder,
      started,
      dropped,
      registry,
    }
  }

  pub fn runtime(self, workflows: Vec<WorkflowDef>) -> (Runtime, Arc<Recorder>, Arc<Notify>, Arc<Notify>) {
    self.runtime_with(workflows, RuntimeConfig::default())
  }

  pub fn runtime_with(
    self,
    workflows: Vec<WorkflowDef>,
    config: RuntimeConfig,
  ) -> (Runtime, Arc<Recorder>, Arc<Notify>, Arc<Notify>) {
    let runtime = Runtime::new(
      Arc::new(MemoryDefinitionStore::with_workflows(workflows)),
      Arc::new(self.registry),
      Arc::new(StaticTextModel::default()),
    )
    .with_config(config);
    (runtime, self.recorder, self.started, self.dropped)
  }
}

pub fn workflow(id: &str, steps: Vec<Step>) -> WorkflowDef {
  WorkflowDef {
    id: id.to_string(),
    organization_id: "org-1".to_string(),
    name: None,
    active: true,
    steps,
  }
}

pub fn step(id: &str, step_type: StepType, behavior_id: &str, parent: Option<&str>) -> Step {
  Step::new(id, step_type, behavior_id, parent)
}

pub fn write(id: &str, parent: &str, set: Value) -> Step {
  Step::new(id, StepType::ThirdParty, "write", Some(parent)).with_config(serde_json::json!({ "set": set }))
}

pub fn write_image(id: &str, parent: &str, set: Value) -> Step {
  Step::new(id, StepType::GenerateImage, "write-image", Some(parent))
    .with_config(serde_json::json!({ "set": set }))
}
