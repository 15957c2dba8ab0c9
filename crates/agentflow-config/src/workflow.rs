use serde::{Deserialize, Serialize};

use crate::step::Step;

/// A persisted workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDef {
  pub id: String,
  pub organization_id: String,
  #[serde(default)]
  pub name: Option<String>,
  pub active: bool,
  /// Steps in no particular order, linked by `parent_id`.
  pub steps: Vec<Step>,
}

impl WorkflowDef {
  /// The parentless step, if there is exactly one.
  pub fn root_step(&self) -> Option<&Step> {
    let mut roots = self.steps.iter().filter(|s| s.is_root());
    match (roots.next(), roots.next()) {
      (Some(root), None) => Some(root),
      _ => None,
    }
  }

  /// Schedule interval declared on the root step (`intervalHours`).
  pub fn schedule_interval_hours(&self) -> Option<u64> {
    self
      .root_step()
      .filter(|root| root.behavior_id == "schedule")
      .and_then(|root| root.config.get("intervalHours"))
      .and_then(|v| v.as_u64())
  }
}
