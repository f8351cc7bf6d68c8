//! Progress node data model

use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Open key/value metrics attached to a node
pub type Metrics = BTreeMap<String, Value>;

/// Placeholder activity used when a caller passes an empty label
pub(crate) const FALLBACK_ACTIVITY: &str = "Working";

/// Opaque identifier of a progress node
///
/// Ids come from a per-stack counter and are never reused while the
/// stack is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgressId(pub(crate) u64);

impl fmt::Display for ProgressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "progress-{}", self.0)
    }
}

/// One trackable operation in the progress forest
#[derive(Debug, Clone)]
pub struct ProgressNode {
    /// Identifier issued by the stack
    pub id: ProgressId,
    /// Short label shown on the bar
    pub activity: String,
    /// Current step description
    pub status: Option<String>,
    /// 0..=100
    pub percent_complete: u8,
    /// Parent this node was started under
    pub parent_id: Option<ProgressId>,
    /// Expected number of child steps
    pub total_operations: Option<u64>,
    /// Child steps finished so far
    pub completed_operations: u64,
    /// Free-form metrics, merged on every update
    pub metrics: Metrics,
    /// When the node was started
    pub started_at: DateTime<Local>,
    /// Set once, on completion
    pub completed_at: Option<DateTime<Local>>,
}

impl ProgressNode {
    pub(crate) fn new(id: ProgressId, spec: NewProgress, parent_id: Option<ProgressId>) -> Self {
        Self {
            id,
            activity: spec.activity,
            status: spec.status,
            percent_complete: 0,
            parent_id,
            total_operations: spec.total_operations,
            completed_operations: 0,
            metrics: spec.metrics,
            started_at: Local::now(),
            completed_at: None,
        }
    }

    /// Whether the node still accepts updates
    pub fn is_live(&self) -> bool {
        self.completed_at.is_none()
    }

    /// Elapsed time since start (or total duration once completed)
    pub fn elapsed(&self) -> chrono::Duration {
        self.completed_at.unwrap_or_else(Local::now) - self.started_at
    }

    pub(crate) fn merge_metrics(&mut self, metrics: Metrics) {
        self.metrics.extend(metrics);
    }

    /// Count one finished step and derive percent from the counters
    pub(crate) fn record_step(&mut self) {
        if let Some(total) = self.total_operations {
            self.completed_operations = self.completed_operations.saturating_add(1).min(total);
            if total > 0 {
                self.percent_complete = step_percent(self.completed_operations, total);
            }
        }
    }
}

/// Percent of `total` reached by `completed`, for any pair of counters
pub(crate) fn step_percent(completed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = u128::from(completed.min(total)) * 100 / u128::from(total);
    percent as u8
}

/// Clamp an arbitrary percent value into 0..=100
pub fn clamp_percent(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

/// Arguments for starting a new node
#[derive(Debug, Clone, Default)]
pub struct NewProgress {
    /// Label; empty labels are replaced by a placeholder
    pub activity: String,
    /// Initial status
    pub status: Option<String>,
    /// Node to nest under
    pub parent: Option<ProgressId>,
    /// Expected number of child steps
    pub total_operations: Option<u64>,
    /// Initial metrics
    pub metrics: Metrics,
}

impl NewProgress {
    /// Start arguments with only an activity label
    pub fn new(activity: impl Into<String>) -> Self {
        Self {
            activity: activity.into(),
            ..Default::default()
        }
    }

    /// Set the status
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Nest under `parent`
    pub fn parent(mut self, parent: ProgressId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the parent only when one is given
    pub fn parent_opt(mut self, parent: Option<ProgressId>) -> Self {
        self.parent = parent;
        self
    }

    /// Expect `total_operations` child steps
    pub fn total(mut self, total_operations: u64) -> Self {
        self.total_operations = Some(total_operations);
        self
    }

    /// Add one metric
    pub fn metric(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }
}

/// Fields merged into a live node by an update
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    /// New percent, clamped into 0..=100
    pub percent: Option<i64>,
    /// New status
    pub status: Option<String>,
    /// New step count; percent follows when a total is set
    pub completed_operations: Option<u64>,
    /// Metrics to merge
    pub metrics: Metrics,
}

impl ProgressUpdate {
    /// An update that changes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the percent
    pub fn percent(mut self, percent: i64) -> Self {
        self.percent = Some(percent);
        self
    }

    /// Set the status
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set the finished step count
    pub fn completed_operations(mut self, completed: u64) -> Self {
        self.completed_operations = Some(completed);
        self
    }

    /// Add one metric
    pub fn metric(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }
}

/// Final status and metrics recorded when a node completes
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// Final status
    pub status: Option<String>,
    /// Metrics to merge
    pub metrics: Metrics,
}

impl Completion {
    /// A completion without status or metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Add one metric
    pub fn metric(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(-10), 0);
        assert_eq!(clamp_percent(0), 0);
        assert_eq!(clamp_percent(42), 42);
        assert_eq!(clamp_percent(150), 100);
    }

    #[test]
    fn test_record_step_derives_percent() {
        let spec = NewProgress::new("Root").total(4);
        let mut node = ProgressNode::new(ProgressId(1), spec, None);

        node.record_step();
        assert_eq!(node.completed_operations, 1);
        assert_eq!(node.percent_complete, 25);

        for _ in 0..10 {
            node.record_step();
        }
        assert_eq!(node.completed_operations, 4);
        assert_eq!(node.percent_complete, 100);
    }

    #[test]
    fn test_record_step_with_huge_total() {
        let spec = NewProgress::new("Root").total(u64::MAX);
        let mut node = ProgressNode::new(ProgressId(1), spec, None);
        node.completed_operations = u64::MAX - 1;

        node.record_step();
        node.record_step();
        assert_eq!(node.completed_operations, u64::MAX);
        assert_eq!(node.percent_complete, 100);
    }

    #[test]
    fn test_step_percent() {
        assert_eq!(step_percent(0, 0), 0);
        assert_eq!(step_percent(1, 3), 33);
        assert_eq!(step_percent(u64::MAX / 2, u64::MAX), 49);
        assert_eq!(step_percent(u64::MAX, u64::MAX), 100);
    }

    #[test]
    fn test_record_step_without_total_is_noop() {
        let mut node = ProgressNode::new(ProgressId(1), NewProgress::new("Root"), None);
        node.record_step();
        assert_eq!(node.completed_operations, 0);
        assert_eq!(node.percent_complete, 0);
    }

    #[test]
    fn test_metrics_merge_not_replace() {
        let spec = NewProgress::new("Root").metric("a", 1);
        let mut node = ProgressNode::new(ProgressId(1), spec, None);

        let mut more = Metrics::new();
        more.insert("b".into(), Value::from("two"));
        more.insert("a".into(), Value::from(3));
        node.merge_metrics(more);

        assert_eq!(node.metrics.len(), 2);
        assert_eq!(node.metrics["a"], Value::from(3));
        assert_eq!(node.metrics["b"], Value::from("two"));
    }

    #[test]
    fn test_progress_id_display() {
        assert_eq!(ProgressId(7).to_string(), "progress-7");
    }
}
