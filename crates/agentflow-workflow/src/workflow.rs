use agentflow_config::WorkflowDef;

use crate::error::WorkflowError;
use crate::tree::{StepNode, StepTree};

/// A locked workflow ready for execution.
#[derive(Debug, Clone)]
pub struct Workflow {
  pub workflow_id: String,
  pub organization_id: String,
  pub name: Option<String>,
  pub active: bool,
  pub tree: StepTree,
}

impl Workflow {
  /// Validate a definition and build its execution tree.
  pub fn lock(def: &WorkflowDef) -> Result<Self, WorkflowError> {
    let tree = StepTree::build(&def.steps)?;

    Ok(Self {
      workflow_id: def.id.clone(),
      organization_id: def.organization_id.clone(),
      name: def.name.clone(),
      active: def.active,
      tree,
    })
  }

  /// The trigger step at the root of the tree.
  pub fn root(&self) -> &StepNode {
    self.tree.root()
  }
}
