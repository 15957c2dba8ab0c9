//! Consumer side of a started run.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

use crate::error::RuntimeError;
use crate::events::{NodeEvent, RunEvent};
use crate::result::RunResult;

/// A started run.
///
/// Dropping the handle (or the stream made from it) before the run finishes
/// cancels the run.
pub struct RunHandle {
  execution_id: String,
  receiver: mpsc::UnboundedReceiver<RunEvent>,
  guard: Option<DropGuard>,
}

impl RunHandle {
  pub(crate) fn new(
    execution_id: String,
    receiver: mpsc::UnboundedReceiver<RunEvent>,
    guard: Option<DropGuard>,
  ) -> Self {
    Self {
      execution_id,
      receiver,
      guard,
    }
  }

  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  /// Wait for the run to finish, discarding node events.
  pub async fn wait(mut self) -> Result<RunResult, RuntimeError> {
    while let Some(event) = self.receiver.recv().await {
      if let RunEvent::Finished(result) = event {
        self.disarm();
        return result;
      }
    }
    Err(RuntimeError::Interrupted)
  }

  /// Wait for the run to finish, collecting node events on the way.
  pub async fn collect(mut self) -> (Vec<NodeEvent>, Result<RunResult, RuntimeError>) {
    let mut nodes = Vec::new();
    while let Some(event) = self.receiver.recv().await {
      match event {
        RunEvent::Node(node) => nodes.push(node),
        RunEvent::Finished(result) => {
          self.disarm();
          return (nodes, result);
        }
      }
    }
    (nodes, Err(RuntimeError::Interrupted))
  }

  /// Observe the run as a stream of events.
  pub fn into_stream(self) -> EventStream {
    EventStream {
      receiver: self.receiver,
      guard: self.guard,
      finished: false,
    }
  }

  fn disarm(&mut self) {
    if let Some(guard) = self.guard.take() {
      guard.disarm();
    }
  }
}

/// Ordered events of one run.
///
/// Yields node events as steps finish and a single [`RunEvent::Finished`]
/// last, then ends.
pub struct EventStream {
  receiver: mpsc::UnboundedReceiver<RunEvent>,
  guard: Option<DropGuard>,
  finished: bool,
}

impl Stream for EventStream {
  type Item = RunEvent;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<RunEvent>> {
    if self.finished {
      return Poll::Ready(None);
    }

    match self.receiver.poll_recv(cx) {
      Poll::Ready(Some(event)) => {
        if event.is_finished() {
          self.finished = true;
          if let Some(guard) = self.guard.take() {
            guard.disarm();
          }
        }
        Poll::Ready(Some(event))
      }
      Poll::Ready(None) => {
        self.finished = true;
        Poll::Ready(Some(RunEvent::Finished(Err(RuntimeError::Interrupted))))
      }
      Poll::Pending => Poll::Pending,
    }
  }
}
