use std::path::{Path, PathBuf};

use agentflow_config::WorkflowDef;
use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use crate::{DefinitionStore, Error, check_id};

/// Filesystem-based definition store.
///
/// Definitions are stored as one JSON file per workflow:
/// ```text
/// {root}/
/// ├── daily-news.json
/// └── weekly-recap.json
/// ```
pub struct FsDefinitionStore {
  root: PathBuf,
}

impl FsDefinitionStore {
  /// Create a new filesystem store at the given root path.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Get the root directory of the store.
  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path(&self, workflow_id: &str) -> Result<PathBuf, Error> {
    check_id(workflow_id)?;
    Ok(self.root.join(format!("{}.json", workflow_id)))
  }
}

#[async_trait]
impl DefinitionStore for FsDefinitionStore {
  async fn load_workflow(&self, workflow_id: &str) -> Result<WorkflowDef, Error> {
    let path = self.path(workflow_id)?;
    let bytes = match fs::read(&path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(Error::NotFound(workflow_id.to_string()));
      }
      Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&bytes).map_err(|source| Error::Parse {
      workflow_id: workflow_id.to_string(),
      source,
    })
  }

  async fn save_workflow(&self, workflow: &WorkflowDef) -> Result<(), Error> {
    let path = self.path(&workflow.id)?;
    fs::create_dir_all(&self.root).await?;

    let json = serde_json::to_vec_pretty(workflow).map_err(|source| Error::Parse {
      workflow_id: workflow.id.clone(),
      source,
    })?;
    fs::write(path, json).await?;
    Ok(())
  }

  async fn list_workflows(&self) -> Result<Vec<WorkflowDef>, Error> {
    let mut entries = match fs::read_dir(&self.root).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(e.into()),
    };

    let mut ids = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().is_some_and(|ext| ext == "json")
        && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
      {
        ids.push(stem.to_string());
      }
    }
    ids.sort();

    let mut workflows = Vec::with_capacity(ids.len());
    for id in ids {
      match self.load_workflow(&id).await {
        Ok(workflow) => workflows.push(workflow),
        Err(e) => warn!(workflow_id = %id, error = %e, "skipping unreadable workflow"),
      }
    }
    Ok(workflows)
  }
}
