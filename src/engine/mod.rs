//! Execution engine for dotwin
//!
//! The engine connects the declarative orchestrator to the terminal:
//! 1. Planning - Build items from a document and filter by target
//! 2. Reporting - Mirror orchestrator events into the progress stack
//! 3. Display - Diffs, per-item results and summaries

pub mod display;
pub mod planner;
pub mod reporter;

pub use planner::build_plan;
pub use reporter::{PromptConfirm, StackProgress};
