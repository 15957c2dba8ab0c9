use std::collections::BTreeMap;
use std::sync::RwLock;

use agentflow_config::WorkflowDef;
use async_trait::async_trait;

use crate::{DefinitionStore, Error, check_id};

/// In-memory definition store.
#[derive(Debug, Default)]
pub struct MemoryDefinitionStore {
  workflows: RwLock<BTreeMap<String, WorkflowDef>>,
}

impl MemoryDefinitionStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store seeded with the given definitions.
  pub fn with_workflows(workflows: impl IntoIterator<Item = WorkflowDef>) -> Self {
    let workflows = workflows
      .into_iter()
      .map(|workflow| (workflow.id.clone(), workflow))
      .collect();
    Self {
      workflows: RwLock::new(workflows),
    }
  }
}

fn poisoned() -> Error {
  Error::Io(std::io::Error::other("definition store lock poisoned"))
}

#[async_trait]
impl DefinitionStore for MemoryDefinitionStore {
  async fn load_workflow(&self, workflow_id: &str) -> Result<WorkflowDef, Error> {
    let workflows = self.workflows.read().map_err(|_| poisoned())?;
    workflows
      .get(workflow_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(workflow_id.to_string()))
  }

  async fn save_workflow(&self, workflow: &WorkflowDef) -> Result<(), Error> {
    check_id(&workflow.id)?;
    let mut workflows = self.workflows.write().map_err(|_| poisoned())?;
    workflows.insert(workflow.id.clone(), workflow.clone());
    Ok(())
  }

  async fn list_workflows(&self) -> Result<Vec<WorkflowDef>, Error> {
    let workflows = self.workflows.read().map_err(|_| poisoned())?;
    Ok(workflows.values().cloned().collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use agentflow_config::{Step, StepType};

  fn workflow(id: &str) -> WorkflowDef {
    WorkflowDef {
      id: id.to_string(),
      organization_id: "org".to_string(),
      name: None,
      active: true,
      steps: vec![Step::new("t", StepType::Trigger, "api", None)],
    }
  }

  #[tokio::test]
  async fn test_load_missing() {
    let store = MemoryDefinitionStore::new();
    assert!(matches!(
      store.load_workflow("nope").await,
      Err(Error::NotFound(id)) if id == "nope"
    ));
  }

  #[tokio::test]
  async fn test_save_and_list_ordered() {
    let store = MemoryDefinitionStore::with_workflows([workflow("b")]);
    store.save_workflow(&workflow("a")).await.unwrap();

    let ids: Vec<_> = store
      .list_workflows()
      .await
      .unwrap()
      .into_iter()
      .map(|w| w.id)
      .collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(store.load_workflow("a").await.unwrap(), workflow("a"));
  }
}
