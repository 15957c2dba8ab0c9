use std::collections::HashMap;
use std::sync::Arc;

use agentflow_workflow::StepTree;

use crate::behavior::Behavior;
use crate::error::RegistryError;

/// Read-only table of behaviors keyed by behavior id.
///
/// Built once through [`BehaviorRegistry::builder`] and shared behind an `Arc`.
/// There is no way to add behaviors after `build`.
pub struct BehaviorRegistry {
  behaviors: HashMap<String, Arc<dyn Behavior>>,
}

impl BehaviorRegistry {
  pub fn builder() -> BehaviorRegistryBuilder {
    BehaviorRegistryBuilder::default()
  }

  /// Look up a behavior by id.
  pub fn get(&self, behavior_id: &str) -> Result<Arc<dyn Behavior>, RegistryError> {
    self
      .behaviors
      .get(behavior_id)
      .cloned()
      .ok_or_else(|| RegistryError::UnknownBehavior {
        behavior_id: behavior_id.to_string(),
      })
  }

  /// Registered behavior ids, sorted.
  pub fn ids(&self) -> Vec<&str> {
    let mut ids: Vec<&str> = self.behaviors.keys().map(String::as_str).collect();
    ids.sort_unstable();
    ids
  }

  pub fn len(&self) -> usize {
    self.behaviors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.behaviors.is_empty()
  }

  /// Resolve the behavior of every step in the tree.
  ///
  /// Fails on the first unknown behavior id or step type mismatch, so nothing
  /// runs against a partially resolvable tree.
  pub fn resolve_all(&self, tree: &StepTree) -> Result<BehaviorBindings, RegistryError> {
    let mut by_step = HashMap::with_capacity(tree.len());

    for node in tree.iter() {
      let behavior = self.get(&node.step.behavior_id)?;
      if behavior.step_type() != node.step.step_type {
        return Err(RegistryError::StepTypeMismatch {
          step_id: node.step.id.clone(),
          behavior_id: node.step.behavior_id.clone(),
          step_type: node.step.step_type,
          behavior_type: behavior.step_type(),
        });
      }
      by_step.insert(node.step.id.clone(), behavior);
    }

    Ok(BehaviorBindings { by_step })
  }
}

impl std::fmt::Debug for BehaviorRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BehaviorRegistry")
      .field("behaviors", &self.ids())
      .finish()
  }
}

/// Builder for [`BehaviorRegistry`].
#[derive(Default)]
pub struct BehaviorRegistryBuilder {
  behaviors: HashMap<String, Arc<dyn Behavior>>,
  duplicates: Vec<String>,
}

impl BehaviorRegistryBuilder {
  pub fn register(self, behavior: impl Behavior + 'static) -> Self {
    self.register_arc(Arc::new(behavior))
  }

  pub fn register_arc(mut self, behavior: Arc<dyn Behavior>) -> Self {
    let id = behavior.id().to_string();
    if self.behaviors.contains_key(&id) {
      self.duplicates.push(id);
    } else {
      self.behaviors.insert(id, behavior);
    }
    self
  }

  pub fn build(self) -> Result<BehaviorRegistry, RegistryError> {
    if let Some(id) = self.duplicates.into_iter().next() {
      return Err(RegistryError::DuplicateBehavior(id));
    }
    Ok(BehaviorRegistry {
      behaviors: self.behaviors,
    })
  }
}

/// Behaviors resolved for every step of one tree, keyed by step id.
#[derive(Clone, Default)]
pub struct BehaviorBindings {
  by_step: HashMap<String, Arc<dyn Behavior>>,
}

impl BehaviorBindings {
  pub fn get(&self, step_id: &str) -> Option<&Arc<dyn Behavior>> {
    self.by_step.get(step_id)
  }

  pub fn len(&self) -> usize {
    self.by_step.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_step.is_empty()
  }
}
