//! # Declarative
//!
//! A framework for declarative configuration items.
//!
//! This crate provides the core abstractions for declaring desired state,
//! testing compliance, and converging a system to match.
//!
//! ## Core Concepts
//!
//! - **ConfigurationItem**: a named unit of desired state with test/apply
//! - **ItemState**: the current or desired state of an item
//! - **ExecutionPlan**: the items selected for a run
//! - **Orchestrator**: tests and applies items with per-item error isolation
//!
//! ## Failure handling
//!
//! An item whose test or apply returns an error never aborts its
//! siblings. The error is recorded in that item's outcome and the run
//! continues, unless [`ErrorPolicy::FailFast`] was requested.
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles user confirmations
//!
//! This keeps the crate free of any particular UI or prompt library.

pub mod context;
pub mod diff;
pub mod item;
pub mod orchestrator;
pub mod planner;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, ElevationRequired, NoProgress,
    ProgressCallback,
};
pub use diff::{DiffSummary, ItemDiff, compute_diffs, group_by_kind};
pub use item::{BoxedItem, ConfigurationItem};
pub use orchestrator::{invoke_items, test_item, test_items};
pub use planner::{ExecutionPlan, parse_target};
pub use types::{
    ApplyResult, ErrorPolicy, ExecuteOptions, ExecuteSummary, InvokeReport, ItemOutcome,
    ItemState, TestOutcome, TestStatus, TestSummary,
};
