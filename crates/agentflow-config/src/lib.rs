//! Agentflow Config
//!
//! This crate contains the serializable workflow definition types for agentflow.
//! These types represent workflows as they are persisted: a flat list of steps
//! linked to their parent by id. The runtime turns them into a tree before
//! execution.
//!
//! Definitions can be loaded from:
//! - JSON files (via CLI with `agentflow run workflow.json`)
//! - A definition store (as JSON documents)

mod enums;
mod step;
mod workflow;

pub use enums::{FailurePolicy, ParseTriggerKindError, TriggerKind};
pub use step::{Step, StepType};
pub use workflow::WorkflowDef;
