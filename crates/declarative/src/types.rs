//! Core types for declarative configuration items

use serde::{Deserialize, Serialize};

/// Current or desired state of a configuration item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ItemState {
    /// Item exists/is configured
    Present { details: Option<String> },
    /// Item does not exist/is not configured
    Absent,
    /// Item exists but differs from desired
    Modified { from: String, to: String },
    /// State cannot be determined
    Unknown,
}

impl ItemState {
    /// Check if state represents presence
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Result of applying an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum ApplyResult {
    /// Already compliant, nothing done
    NoChange,
    /// Item was created
    Created,
    /// Item was modified
    Modified,
    /// Item was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

/// Compliance verdict for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TestStatus {
    Compliant,
    NonCompliant,
    /// The test itself failed
    Failed { error: String },
}

impl TestStatus {
    pub fn is_compliant(&self) -> bool {
        matches!(self, Self::Compliant)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcome of testing one item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub name: String,
    pub kind: String,
    pub description: String,
    #[serde(flatten)]
    pub status: TestStatus,
    pub duration_ms: u64,
}

/// Outcome of invoking (test + apply) one item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub name: String,
    pub kind: String,
    #[serde(flatten)]
    pub result: ApplyResult,
    pub duration_ms: u64,
}

/// Counts of test verdicts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub compliant: usize,
    pub non_compliant: usize,
    pub failed: usize,
}

impl TestSummary {
    pub fn from_outcomes(outcomes: &[TestOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome.status {
                TestStatus::Compliant => summary.compliant += 1,
                TestStatus::NonCompliant => summary.non_compliant += 1,
                TestStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.compliant + self.non_compliant + self.failed
    }

    /// Every item tested compliant
    pub fn is_compliant(&self) -> bool {
        self.non_compliant == 0 && self.failed == 0
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of items processed
    pub fn total(&self) -> usize {
        self.created + self.modified + self.removed + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Per-item results of an invoke run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeReport {
    pub summary: ExecuteSummary,
    pub outcomes: Vec<ItemOutcome>,
    /// A fail-fast policy stopped the run before every item was handled
    pub stopped_early: bool,
}

impl InvokeReport {
    pub(crate) fn push(&mut self, outcome: ItemOutcome) {
        self.summary.add_result(&outcome.result);
        self.outcomes.push(outcome);
    }
}

/// What to do when an item fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorPolicy {
    /// Record the failure and move on to the next item
    #[default]
    Continue,
    /// Stop at the first failure; remaining items are skipped
    FailFast,
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs for parallel test mode
    pub jobs: usize,
    /// Run item tests on a worker pool
    pub parallel: bool,
    /// Verbose output
    pub verbose: bool,
    /// Running with administrator rights
    pub elevated: bool,
    pub error_policy: ErrorPolicy,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            parallel: false,
            verbose: false,
            elevated: false,
            error_policy: ErrorPolicy::Continue,
        }
    }
}
