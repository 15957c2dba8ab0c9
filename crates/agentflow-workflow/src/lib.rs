//! Agentflow Workflow
//!
//! This crate provides the "locked" workflow representation for agentflow.
//! A locked workflow is a validated form of a workflow definition that is
//! ready for execution.
//!
//! Key differences from `agentflow-config`:
//! - Flat steps are assembled into a rooted tree by parent linkage
//! - Exactly one parentless trigger step is enforced
//! - Every step is reachable from the root
//! - The step-type dependency table is checked along every ancestor chain

mod error;
mod tree;
mod workflow;

pub use error::WorkflowError;
pub use tree::{StepIter, StepNode, StepTree, build_subtree};
pub use workflow::Workflow;
