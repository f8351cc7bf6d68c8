//! Apply context and callback traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific progress display or prompt implementation.

use crate::types::{ItemOutcome, TestOutcome};
use anyhow::Result;
use thiserror::Error;

/// Raised when an item needs administrator rights the process lacks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("requires administrator privileges: {reason}")]
pub struct ElevationRequired {
    pub reason: String,
}

/// Progress callback for orchestration
///
/// Implement this trait to receive progress updates during test and
/// invoke runs. In parallel test mode `on_item_start` is not called and
/// `on_item_tested` is called for every item after all workers finished.
pub trait ProgressCallback {
    /// Called when starting a batch ("Testing", "Applying") of `count` items
    fn on_batch_start(&mut self, label: &str, count: usize);

    /// Called when starting to work on a single item
    fn on_item_start(&mut self, name: &str, description: &str);

    /// Called when an item's test completes
    fn on_item_tested(&mut self, outcome: &TestOutcome);

    /// Called when an item's apply completes (or is skipped)
    fn on_item_applied(&mut self, outcome: &ItemOutcome);

    /// Called when a batch completes
    fn on_batch_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _label: &str, _count: usize) {}
    fn on_item_start(&mut self, _name: &str, _description: &str) {}
    fn on_item_tested(&mut self, _outcome: &TestOutcome) {}
    fn on_item_applied(&mut self, _outcome: &ItemOutcome) {}
    fn on_batch_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Context passed to item apply operations
#[derive(Debug, Clone, Copy)]
pub struct ApplyContext {
    /// Whether this is a dry run (no actual changes)
    pub dry_run: bool,
    /// Whether to output verbose information
    pub verbose: bool,
    /// Whether the process runs with administrator rights
    pub elevated: bool,
}

impl ApplyContext {
    pub fn new(dry_run: bool, verbose: bool, elevated: bool) -> Self {
        Self {
            dry_run,
            verbose,
            elevated,
        }
    }

    /// Error unless the process is elevated
    pub fn require_elevation(&self, reason: &str) -> Result<(), ElevationRequired> {
        if self.elevated {
            Ok(())
        } else {
            Err(ElevationRequired {
                reason: reason.to_string(),
            })
        }
    }
}
