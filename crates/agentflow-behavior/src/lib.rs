//! Agentflow Behavior
//!
//! The contract between the dispatcher and the pluggable units of work bound
//! to steps:
//! - [`Behavior`] and the [`BehaviorInput`] it receives
//! - [`ExecutionState`] snapshots and the [`StateDelta`] a behavior returns
//! - [`BehaviorRegistry`], the read-only id → behavior table
//! - capability traits behaviors call out to ([`TextModel`], [`GenerationProvider`],
//!   [`Publisher`], [`FeedSource`])
//! - config template rendering against state

mod behavior;
mod capability;
mod error;
pub mod memory;
mod registry;
mod state;
mod template;

pub use behavior::{Behavior, BehaviorInput};
pub use capability::{
  FeedSource, GeneratedMedia, GenerationProvider, Post, PublishReceipt, Publisher, TextModel,
};
pub use error::{BehaviorError, CapabilityError, RegistryError};
pub use registry::{BehaviorBindings, BehaviorRegistry, BehaviorRegistryBuilder};
pub use state::{ExecutionState, PayloadError, StateDelta};
pub use template::render_config;
