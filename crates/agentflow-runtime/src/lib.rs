//! Agentflow Runtime
//!
//! This crate executes workflows. It loads a definition, builds its step
//! tree, binds behaviors, and walks the tree with per-branch state snapshots.
//! Every run reports through one event channel that serves both the awaited
//! result ([`RunHandle::wait`]) and the live view ([`EventStream`]).
//!
//! [`ScheduleRunner`] turns scheduler messages into `schedule` runs.

mod dispatcher;
mod error;
mod events;
mod result;
mod runner;
mod runtime;
mod stream;

pub use error::RuntimeError;
pub use events::{ChannelNotifier, NodeEvent, NodeOutcome, NoopNotifier, RunEvent, RunNotifier};
pub use result::{LeafState, NodeFailure, RunReport, RunResult, SkipReason};
pub use runner::{ScheduleRunner, schedule_all};
pub use runtime::{DEFAULT_RUN_TIMEOUT, RunDelivery, RunRequest, Runtime, RuntimeConfig};
pub use stream::{EventStream, RunHandle};
