//! Orchestrator callbacks backed by the progress stack and dialoguer

use anyhow::Result;
use declarative::{
    ApplyResult, ConfirmCallback, ItemOutcome, ProgressCallback, TestOutcome, TestStatus,
};
use indicatif::MultiProgress;
use termkit::{Completion, LogLevel, NewProgress, ProgressId, ProgressStack};

/// Mirrors orchestrator events into nodes under a parent.
///
/// Each batch ("Testing", "Applying") becomes a child of `parent` sized to
/// its item count, and each item a child of the batch. Outcomes that arrive
/// without a started node (parallel tests, skipped items) get a node that
/// is completed straight away, so batch step counts stay right.
pub struct StackProgress<'a> {
    stack: &'a mut ProgressStack,
    parent: Option<ProgressId>,
    batch: Option<ProgressId>,
    current: Option<(ProgressId, String)>,
}

impl<'a> StackProgress<'a> {
    pub fn new(stack: &'a mut ProgressStack, parent: Option<ProgressId>) -> Self {
        Self {
            stack,
            parent,
            batch: None,
            current: None,
        }
    }

    /// Complete the node for `name`, starting one first if needed
    fn finish_item(&mut self, name: &str, status: &str, failed: bool) {
        let id = match self.current.take() {
            Some((id, current)) if current == name => id,
            other => {
                if let Some((stale, _)) = other {
                    self.stack.complete(stale, Completion::new());
                }
                self.stack
                    .start(NewProgress::new(name).parent_opt(self.batch))
            }
        };

        let mut completion = Completion::new().status(status);
        if failed {
            completion = completion.metric("failed", true);
        }
        self.stack.complete(id, completion);
    }

    fn report(&mut self, line: &str, level: LogLevel) {
        self.stack.log(line, level, self.batch);
    }
}

impl ProgressCallback for StackProgress<'_> {
    fn on_batch_start(&mut self, label: &str, count: usize) {
        let spec = NewProgress::new(label)
            .parent_opt(self.parent)
            .total(count as u64)
            .metric("items", count as u64);
        self.batch = Some(self.stack.start(spec));
    }

    fn on_item_start(&mut self, name: &str, description: &str) {
        if let Some((stale, _)) = self.current.take() {
            self.stack.complete(stale, Completion::new());
        }
        let id = self.stack.start(
            NewProgress::new(name)
                .status(description)
                .parent_opt(self.batch),
        );
        self.current = Some((id, name.to_string()));
    }

    fn on_item_tested(&mut self, outcome: &TestOutcome) {
        let (line, level, status) = match &outcome.status {
            TestStatus::Compliant => (
                format!("{} is compliant", outcome.name),
                LogLevel::Success,
                "Compliant".to_string(),
            ),
            TestStatus::NonCompliant => (
                format!("{} is not compliant", outcome.name),
                LogLevel::Warning,
                "Not compliant".to_string(),
            ),
            TestStatus::Failed { error } => (
                format!("{}: test failed: {}", outcome.name, error),
                LogLevel::Error,
                format!("Failed: {error}"),
            ),
        };
        self.report(&line, level);
        self.finish_item(&outcome.name, &status, outcome.status.is_failed());
    }

    fn on_item_applied(&mut self, outcome: &ItemOutcome) {
        let (line, level) = match &outcome.result {
            ApplyResult::NoChange => (format!("{}: no change", outcome.name), LogLevel::Verbose),
            ApplyResult::Created => (format!("{}: created", outcome.name), LogLevel::Success),
            ApplyResult::Modified => (format!("{}: modified", outcome.name), LogLevel::Success),
            ApplyResult::Removed => (format!("{}: removed", outcome.name), LogLevel::Success),
            ApplyResult::Skipped { reason } => (
                format!("{}: skipped ({})", outcome.name, reason),
                LogLevel::Info,
            ),
            ApplyResult::Failed { error } => {
                (format!("{}: {}", outcome.name, error), LogLevel::Error)
            }
        };
        self.report(&line, level);
        self.finish_item(
            &outcome.name,
            &result_label(&outcome.result),
            !outcome.result.is_success(),
        );
    }

    fn on_batch_complete(&mut self) {
        if let Some((stale, _)) = self.current.take() {
            self.stack.complete(stale, Completion::new());
        }
        if let Some(batch) = self.batch.take() {
            let done = self
                .stack
                .node(batch)
                .map_or(0, |n| n.completed_operations);
            self.stack
                .complete(batch, Completion::new().status(format!("{done} item(s)")));
        }
    }
}

/// Short label for a result, used as a node's final status
pub fn result_label(result: &ApplyResult) -> String {
    match result {
        ApplyResult::NoChange => "No change".to_string(),
        ApplyResult::Created => "Created".to_string(),
        ApplyResult::Modified => "Modified".to_string(),
        ApplyResult::Removed => "Removed".to_string(),
        ApplyResult::Skipped { reason } => format!("Skipped: {reason}"),
        ApplyResult::Failed { error } => format!("Failed: {error}"),
    }
}

/// Confirmation through a dialoguer prompt, drawn with the progress frame
/// suspended.
///
/// `--yes` confirms without asking. Without a terminal there is nobody to
/// ask, so the answer is no.
pub struct PromptConfirm {
    yes: bool,
    draw: MultiProgress,
}

impl PromptConfirm {
    pub fn new(yes: bool, draw: MultiProgress) -> Self {
        Self { yes, draw }
    }
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        if self.yes {
            return Ok(true);
        }
        if !console::Term::stderr().is_term() {
            log::warn!("Not running in a terminal; pass --yes to apply changes");
            return Ok(false);
        }

        let confirmed = self.draw.suspend(|| {
            Confirm::new()
                .with_prompt(prompt)
                .default(true)
                .interact()
        })?;
        Ok(confirmed)
    }
}
