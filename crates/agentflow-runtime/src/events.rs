//! Run events and notifiers.
//!
//! The dispatcher emits one [`NodeEvent`] per executed behavior. The runtime
//! closes every run with exactly one [`RunEvent::Finished`].

use agentflow_behavior::StateDelta;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::RuntimeError;
use crate::result::RunResult;

/// Events observed by a run's consumer.
#[derive(Debug)]
pub enum RunEvent {
  /// A behavior finished, successfully or not.
  Node(NodeEvent),

  /// The run is over. Always the last event of a run.
  Finished(Result<RunResult, RuntimeError>),
}

impl RunEvent {
  pub fn is_finished(&self) -> bool {
    matches!(self, RunEvent::Finished(_))
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEvent {
  pub execution_id: String,
  pub node_id: String,
  pub behavior_id: String,
  #[serde(flatten)]
  pub outcome: NodeOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeOutcome {
  Completed { delta: StateDelta },
  Failed { error: String },
}

/// Trait for receiving node events.
///
/// The dispatcher calls `notify` for each executed node. Implementations
/// decide what to do with them (stream, persist, ignore).
pub trait RunNotifier: Send + Sync {
  fn notify(&self, event: NodeEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl RunNotifier for NoopNotifier {
  fn notify(&self, _event: NodeEvent) {}
}

/// A notifier that forwards events to an unbounded channel.
///
/// Unbounded so a slow consumer never stalls the walk; volume is one event
/// per step.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
    Self { sender }
  }
}

impl RunNotifier for ChannelNotifier {
  fn notify(&self, event: NodeEvent) {
    // Receiver may have been dropped; the run's drop guard handles cancellation.
    let _ = self.sender.send(RunEvent::Node(event));
  }
}
