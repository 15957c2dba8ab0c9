//! Interval timers for `schedule`-triggered workflows.
//!
//! Each active schedule is a tokio task that sends a [`ScheduleMessage`] on
//! the scheduler's channel every interval. The consumer (the runtime's
//! schedule runner) maps each message to one run.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::Error;

/// Message sent when a schedule fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleMessage {
  pub workflow_id: String,
}

struct Schedule {
  cancel: CancellationToken,
  handle: JoinHandle<()>,
}

/// Owns the interval task of every active schedule.
///
/// Dropping the scheduler stops all schedules.
pub struct Scheduler {
  sender: mpsc::Sender<ScheduleMessage>,
  schedules: Mutex<HashMap<String, Schedule>>,
  cancel: CancellationToken,
}

impl Scheduler {
  /// Create a scheduler sending on `sender`.
  pub fn new(sender: mpsc::Sender<ScheduleMessage>) -> Self {
    Self {
      sender,
      schedules: Mutex::new(HashMap::new()),
      cancel: CancellationToken::new(),
    }
  }

  /// Create a scheduler together with the receiving end of its channel.
  pub fn channel(buffer_size: usize) -> (Self, mpsc::Receiver<ScheduleMessage>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (Self::new(sender), receiver)
  }

  /// Fire `workflow_id` every `interval_hours` hours.
  pub fn start_schedule(&self, workflow_id: &str, interval_hours: u64) -> Result<(), Error> {
    let period = Duration::from_secs(interval_hours.saturating_mul(3600));
    self.start_every(workflow_id, period)
  }

  /// Fire `workflow_id` every `period`, first after one full period.
  ///
  /// Restarting an active schedule replaces it.
  pub fn start_every(&self, workflow_id: &str, period: Duration) -> Result<(), Error> {
    if period.is_zero() {
      return Err(Error::InvalidSchedule {
        workflow_id: workflow_id.to_string(),
        message: "interval must be greater than zero".to_string(),
      });
    }

    let mut schedules = self.lock()?;
    let cancel = self.cancel.child_token();
    let handle = tokio::spawn(fire_loop(
      workflow_id.to_string(),
      period,
      self.sender.clone(),
      cancel.clone(),
    ));

    let previous = schedules.insert(workflow_id.to_string(), Schedule { cancel, handle });
    drop(schedules);
    if let Some(previous) = previous {
      previous.cancel.cancel();
      debug!(workflow_id, "schedule replaced");
    }

    info!(workflow_id, period_secs = period.as_secs(), "schedule started");
    Ok(())
  }

  /// Stop a schedule. Returns whether one was active.
  pub fn stop_schedule(&self, workflow_id: &str) -> Result<bool, Error> {
    let removed = self.lock()?.remove(workflow_id);
    match removed {
      Some(schedule) => {
        schedule.cancel.cancel();
        info!(workflow_id, "schedule stopped");
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Ids of running schedules, sorted.
  pub fn active(&self) -> Vec<String> {
    let Ok(schedules) = self.schedules.lock() else {
      return Vec::new();
    };
    let mut ids: Vec<String> = schedules
      .iter()
      .filter(|(_, s)| !s.handle.is_finished())
      .map(|(id, _)| id.clone())
      .collect();
    ids.sort();
    ids
  }

  /// Stop every schedule.
  pub fn shutdown(&self) {
    self.cancel.cancel();
    if let Ok(mut schedules) = self.schedules.lock() {
      schedules.clear();
    }
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Schedule>>, Error> {
    self
      .schedules
      .lock()
      .map_err(|_| Error::Io(std::io::Error::other("scheduler lock poisoned")))
  }
}

impl Drop for Scheduler {
  fn drop(&mut self) {
    self.cancel.cancel();
  }
}

async fn fire_loop(
  workflow_id: String,
  period: Duration,
  sender: mpsc::Sender<ScheduleMessage>,
  cancel: CancellationToken,
) {
  let mut interval = tokio::time::interval_at(Instant::now() + period, period);
  interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

  loop {
    tokio::select! {
      _ = cancel.cancelled() => break,
      _ = interval.tick() => {
        debug!(workflow_id = %workflow_id, "schedule fired");
        let message = ScheduleMessage { workflow_id: workflow_id.clone() };
        if sender.send(message).await.is_err() {
          debug!(workflow_id = %workflow_id, "schedule channel closed");
          break;
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const HOUR: Duration = Duration::from_secs(3600);

  #[tokio::test(start_paused = true)]
  async fn test_fires_on_interval() {
    let (scheduler, mut rx) = Scheduler::channel(8);
    scheduler.start_schedule("news", 1).unwrap();

    let started = Instant::now();
    let first = rx.recv().await.unwrap();
    assert_eq!(first.workflow_id, "news");
    assert!(started.elapsed() >= HOUR);

    let second = rx.recv().await.unwrap();
    assert_eq!(second.workflow_id, "news");
    assert!(started.elapsed() >= HOUR * 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_zero_interval_rejected() {
    let (scheduler, _rx) = Scheduler::channel(8);
    assert!(matches!(
      scheduler.start_schedule("news", 0),
      Err(Error::InvalidSchedule { .. })
    ));
    assert!(scheduler.active().is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_restart_replaces_schedule() {
    let (scheduler, mut rx) = Scheduler::channel(8);
    scheduler.start_every("news", HOUR).unwrap();
    scheduler.start_every("news", HOUR * 3).unwrap();
    assert_eq!(scheduler.active(), vec!["news".to_string()]);

    let started = Instant::now();
    rx.recv().await.unwrap();
    assert!(started.elapsed() >= HOUR * 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stop_schedule() {
    let (scheduler, mut rx) = Scheduler::channel(8);
    scheduler.start_every("news", HOUR).unwrap();
    scheduler.start_every("recap", HOUR * 24).unwrap();
    assert_eq!(scheduler.active(), vec!["news".to_string(), "recap".to_string()]);

    assert!(scheduler.stop_schedule("news").unwrap());
    assert!(!scheduler.stop_schedule("news").unwrap());
    assert_eq!(scheduler.active(), vec!["recap".to_string()]);

    let quiet = tokio::time::timeout(HOUR * 2, rx.recv()).await;
    assert!(quiet.is_err());
  }

  #[tokio::test(start_paused = true)]
  async fn test_poisoned_lock_starts_nothing() {
    let (scheduler, mut rx) = Scheduler::channel(8);
    let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
      let _guard = scheduler.schedules.lock().unwrap();
      panic!("poison");
    }));
    assert!(poisoned.is_err());

    assert!(matches!(scheduler.start_every("news", HOUR), Err(Error::Io(_))));

    let quiet = tokio::time::timeout(HOUR * 2, rx.recv()).await;
    assert!(quiet.is_err());
  }
}
