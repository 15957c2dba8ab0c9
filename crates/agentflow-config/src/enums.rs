use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a run was invoked.
///
/// The root trigger step declares which kind it accepts through its
/// behavior id ("api" or "schedule").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
  /// Direct invocation (HTTP call, CLI).
  Api,
  /// Timer message from the scheduler.
  Schedule,
}

impl TriggerKind {
  pub fn as_str(self) -> &'static str {
    match self {
      TriggerKind::Api => "api",
      TriggerKind::Schedule => "schedule",
    }
  }
}

impl fmt::Display for TriggerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trigger kind: {0}")]
pub struct ParseTriggerKindError(pub String);

impl FromStr for TriggerKind {
  type Err = ParseTriggerKindError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "api" => Ok(TriggerKind::Api),
      "schedule" => Ok(TriggerKind::Schedule),
      other => Err(ParseTriggerKindError(other.to_string())),
    }
  }
}

/// What a run does when one step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
  /// Stop only the failing step's subtree; sibling branches keep running.
  #[default]
  Isolate,
  /// Cancel every remaining branch and fail the run.
  AbortRun,
}
