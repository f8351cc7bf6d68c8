//! The progress stack: node lifecycle, rendering and log coordination

use super::node::{
    Completion, FALLBACK_ACTIVITY, NewProgress, ProgressId, ProgressNode, ProgressUpdate,
    clamp_percent, step_percent,
};
use super::render::{FrameLine, RenderMode, Renderer, build_frame, depth_of};
use crate::error::ProgressError;
use crate::format::format_elapsed;
use crate::sink::{LogLevel, LogRecord, LogSink};
use indicatif::MultiProgress;
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Display;

/// Completed nodes kept for inspection after they leave the display
pub const DEFAULT_RETENTION: usize = 64;

/// Construction options for a [`ProgressStack`]
#[derive(Debug, Clone, Copy)]
pub struct StackOptions {
    /// How the frame is drawn
    pub mode: RenderMode,
    /// Completed nodes kept in history
    pub retention: usize,
}

impl StackOptions {
    /// Interactive on a terminal, plain otherwise
    pub fn detect() -> Self {
        Self {
            mode: RenderMode::detect(),
            retention: DEFAULT_RETENTION,
        }
    }

    /// No console drawing
    pub fn hidden() -> Self {
        Self {
            mode: RenderMode::Hidden,
            retention: DEFAULT_RETENTION,
        }
    }

    /// Keep at most `retention` completed nodes; 0 keeps none
    pub fn retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }
}

impl Default for StackOptions {
    fn default() -> Self {
        Self::detect()
    }
}

/// Counters describing what the stack has done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackStats {
    /// Nodes started
    pub started: u64,
    /// Nodes completed, forced ones included
    pub completed: u64,
    /// Bookkeeping errors reported as warnings
    pub warnings: u64,
}

/// Registry of live progress nodes plus the console rendering policy.
///
/// Nodes form a forest through their parent links. A completed node that
/// still has live descendants stays tracked (and visible) as an anchor
/// until the last of them completes; after that it moves to a bounded
/// history.
///
/// Bookkeeping mistakes (unknown ids, dangling parents, double completion)
/// never propagate. They are logged as warnings and leave node state as it
/// was.
pub struct ProgressStack {
    nodes: BTreeMap<ProgressId, ProgressNode>,
    history: VecDeque<ProgressNode>,
    next_id: u64,
    retention: usize,
    renderer: Renderer,
    sink: LogSink,
    stats: StackStats,
}

impl ProgressStack {
    /// Create an empty stack writing through `sink`
    pub fn new(sink: LogSink, options: StackOptions) -> Self {
        Self {
            nodes: BTreeMap::new(),
            history: VecDeque::with_capacity(options.retention),
            next_id: 0,
            retention: options.retention,
            renderer: Renderer::new(options.mode),
            sink,
            stats: StackStats::default(),
        }
    }

    /// Stack that never draws, around the given sink
    pub fn hidden(sink: LogSink) -> Self {
        Self::new(sink, StackOptions::hidden())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create and register a node.
    ///
    /// The parent may be any node this stack has issued: live, completed
    /// but still anchoring children, or already retired. A retired parent
    /// is no longer on display, so the node renders as a root. An id the
    /// stack never issued is reported and the node becomes a root.
    pub fn start(&mut self, spec: NewProgress) -> ProgressId {
        let mut spec = spec;
        if spec.activity.trim().is_empty() {
            self.soft_fail(ProgressError::EmptyActivity);
            spec.activity = FALLBACK_ACTIVITY.to_string();
        }

        let parent = match spec.parent {
            Some(parent) if self.was_issued(parent) => Some(parent),
            Some(parent) => {
                self.soft_fail(ProgressError::InvalidParent(parent));
                None
            }
            None => None,
        };

        self.next_id += 1;
        let id = ProgressId(self.next_id);
        let node = ProgressNode::new(id, spec, parent);
        self.nodes.insert(id, node);
        self.stats.started += 1;

        if self.renderer.mode() == RenderMode::Plain {
            self.plain_event(id, LogLevel::Info, None);
        }
        self.render();
        id
    }

    /// Merge the given fields into a live node
    pub fn update(&mut self, id: ProgressId, update: ProgressUpdate) {
        if let Err(e) = self.check_live(id) {
            self.soft_fail(e);
            return;
        }
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };

        if let Some(completed) = update.completed_operations {
            node.completed_operations = match node.total_operations {
                Some(total) => completed.min(total),
                None => completed,
            };
            if let Some(total) = node.total_operations.filter(|t| *t > 0) {
                node.percent_complete = step_percent(node.completed_operations, total);
            }
        }
        if let Some(percent) = update.percent {
            node.percent_complete = clamp_percent(percent);
        }
        if let Some(status) = update.status {
            node.status = Some(status);
        }
        node.merge_metrics(update.metrics);

        self.render();
    }

    /// Mark a node completed.
    ///
    /// The parent's step counter advances. If the node has no live
    /// descendants it leaves the display together with any completed
    /// ancestors it was keeping visible.
    pub fn complete(&mut self, id: ProgressId, completion: Completion) {
        if let Err(e) = self.check_live(id) {
            self.soft_fail(e);
            return;
        }
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };

        node.completed_at = Some(chrono::Local::now());
        node.percent_complete = 100;
        if let Some(status) = completion.status {
            node.status = Some(status);
        }
        node.merge_metrics(completion.metrics);
        let parent = node.parent_id;
        self.stats.completed += 1;

        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p))
            && parent.is_live()
        {
            parent.record_step();
        }

        if self.renderer.mode() == RenderMode::Plain {
            let elapsed = self.nodes.get(&id).map(|n| format_elapsed(n.elapsed()));
            self.plain_event(id, LogLevel::Success, elapsed);
        }

        self.prune(id);
        self.render();
    }

    /// Complete every live node, deepest first, so that no parent reaches
    /// 100% before its children. Returns how many nodes were completed.
    pub fn force_complete_all(&mut self) -> usize {
        let mut live: Vec<(usize, ProgressId)> = self
            .nodes
            .values()
            .filter(|n| n.is_live())
            .map(|n| (depth_of(&self.nodes, n.id), n.id))
            .collect();
        live.sort_by(|a, b| b.cmp(a));

        let count = live.len();
        for (_, id) in live {
            self.complete(id, Completion::new().metric("forced", true));
        }
        count
    }

    /// Run `f` inside a node that is completed on both the success and the
    /// error path.
    pub fn scoped<T, E, F>(&mut self, spec: NewProgress, f: F) -> Result<T, E>
    where
        E: Display,
        F: FnOnce(&mut Self, ProgressId) -> Result<T, E>,
    {
        let id = self.start(spec);
        let result = f(self, id);
        let completion = match &result {
            Ok(_) => Completion::new().status("Done"),
            Err(e) => Completion::new()
                .status(format!("Failed: {e}"))
                .metric("failed", true),
        };
        // The closure may already have completed the node itself
        if self.is_live(id) {
            self.complete(id, completion);
        }
        result
    }

    // ========================================================================
    // Rendering and logging
    // ========================================================================

    /// Recompute and draw the frame from scratch
    pub fn render(&mut self) {
        let frame = build_frame(&self.nodes);
        self.renderer.draw(&frame);
    }

    /// Current frame, as it would be drawn
    pub fn frame(&self) -> Vec<FrameLine> {
        build_frame(&self.nodes)
    }

    /// Log a message without corrupting the progress display.
    ///
    /// Empty messages are dropped and filtered levels never touch the
    /// display. With live nodes the frame is cleared for the write and
    /// redrawn afterwards. A `progress_id` naming a tracked node indents
    /// the line under it and tags the file output with its activity.
    pub fn log(&mut self, message: &str, level: LogLevel, progress_id: Option<ProgressId>) {
        if message.trim().is_empty() || !self.sink.enabled(level) {
            return;
        }

        let node = progress_id.and_then(|id| self.nodes.get(&id));
        let record = LogRecord {
            level,
            message,
            depth: node.map_or(0, |n| depth_of(&self.nodes, n.id)),
            activity: node.map(|n| n.activity.as_str()),
        };

        let sink = &mut self.sink;
        if self.nodes.values().any(ProgressNode::is_live) {
            self.renderer.suspend(|| sink.emit(&record));
        } else {
            sink.emit(&record);
        }
    }

    /// Log at [`LogLevel::Info`] without a node
    pub fn info(&mut self, message: &str) {
        self.log(message, LogLevel::Info, None);
    }

    /// Log at [`LogLevel::Success`] without a node
    pub fn success(&mut self, message: &str) {
        self.log(message, LogLevel::Success, None);
    }

    /// Log at [`LogLevel::Warning`] without a node
    pub fn warn(&mut self, message: &str) {
        self.log(message, LogLevel::Warning, None);
    }

    /// Log at [`LogLevel::Error`] without a node
    pub fn error(&mut self, message: &str) {
        self.log(message, LogLevel::Error, None);
    }

    /// Log at [`LogLevel::Verbose`] without a node
    pub fn verbose(&mut self, message: &str) {
        self.log(message, LogLevel::Verbose, None);
    }

    /// Handle shared with other writers (e.g. the `log` bridge)
    pub fn draw_target(&self) -> MultiProgress {
        self.renderer.draw_target()
    }

    /// The sink every message goes through
    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    /// Mutable sink, to change the level or the log file
    pub fn sink_mut(&mut self) -> &mut LogSink {
        &mut self.sink
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// A tracked node (live or anchor)
    pub fn node(&self, id: ProgressId) -> Option<&ProgressNode> {
        self.nodes.get(&id)
    }

    /// Whether `id` is tracked and not completed
    pub fn is_live(&self, id: ProgressId) -> bool {
        self.nodes.get(&id).is_some_and(ProgressNode::is_live)
    }

    /// Nodes that have not completed yet
    pub fn live_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_live()).count()
    }

    /// Live nodes plus completed anchors still on display
    pub fn tracked_count(&self) -> usize {
        self.nodes.len()
    }

    /// Recently retired nodes, oldest first
    pub fn history(&self) -> impl Iterator<Item = &ProgressNode> {
        self.history.iter()
    }

    /// Look a node up among tracked and retired nodes
    pub fn find(&self, id: ProgressId) -> Option<&ProgressNode> {
        self.nodes
            .get(&id)
            .or_else(|| self.history.iter().find(|n| n.id == id))
    }

    /// Counters since creation
    pub fn stats(&self) -> StackStats {
        self.stats
    }

    /// Render mode chosen at construction
    pub fn mode(&self) -> RenderMode {
        self.renderer.mode()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn check_live(&self, id: ProgressId) -> Result<(), ProgressError> {
        match self.nodes.get(&id) {
            Some(node) if node.is_live() => Ok(()),
            Some(_) => Err(ProgressError::AlreadyCompleted(id)),
            // Issued earlier and already retired
            None if self.was_issued(id) => Err(ProgressError::AlreadyCompleted(id)),
            None => Err(ProgressError::UnknownId(id)),
        }
    }

    fn was_issued(&self, id: ProgressId) -> bool {
        id.0 > 0 && id.0 <= self.next_id
    }

    fn soft_fail(&mut self, error: ProgressError) {
        self.stats.warnings += 1;
        log::debug!("progress bookkeeping: {error:?}");
        self.log(&error.to_string(), LogLevel::Warning, None);
    }

    /// Retire `id` and then each completed ancestor that no longer has
    /// tracked children
    fn prune(&mut self, id: ProgressId) {
        let mut current = Some(id);
        while let Some(candidate) = current {
            let keep = match self.nodes.get(&candidate) {
                Some(node) => node.is_live() || self.has_children(candidate),
                None => true,
            };
            if keep {
                break;
            }
            let Some(node) = self.nodes.remove(&candidate) else {
                break;
            };
            current = node.parent_id;
            self.retire(node);
        }
    }

    fn has_children(&self, id: ProgressId) -> bool {
        self.nodes.values().any(|n| n.parent_id == Some(id))
    }

    fn retire(&mut self, node: ProgressNode) {
        if self.retention == 0 {
            return;
        }
        while self.history.len() >= self.retention {
            self.history.pop_front();
        }
        self.history.push_back(node);
    }

    fn plain_event(&mut self, id: ProgressId, level: LogLevel, suffix: Option<String>) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let mut message = node.activity.clone();
        if let Some(status) = &node.status {
            message.push_str(&format!(": {status}"));
        }
        if let Some(suffix) = suffix {
            message.push_str(&format!(" ({suffix})"));
        }
        self.log(&message, level, Some(id));
    }
}

impl Drop for ProgressStack {
    fn drop(&mut self) {
        self.force_complete_all();
        self.renderer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Captured;

    fn stack() -> (ProgressStack, Captured) {
        let (sink, captured) = LogSink::capture(LogLevel::Debug);
        (ProgressStack::hidden(sink), captured)
    }

    fn ancestors_terminate(stack: &ProgressStack) -> bool {
        stack.frame().iter().all(|line| {
            let mut current = stack.node(line.id).and_then(|n| n.parent_id);
            let mut hops = 0;
            while let Some(parent) = current {
                hops += 1;
                if hops > stack.tracked_count() {
                    return false;
                }
                match stack.node(parent) {
                    Some(node) => current = node.parent_id,
                    // retired parent, rendered as a root
                    None => break,
                }
            }
            true
        })
    }

    #[test]
    fn test_start_assigns_unique_ids() {
        let (mut stack, _) = stack();
        let a = stack.start(NewProgress::new("a"));
        let b = stack.start(NewProgress::new("b"));
        stack.complete(a, Completion::new());
        let c = stack.start(NewProgress::new("c"));

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
        assert_eq!(stack.live_count(), 2);
    }

    #[test]
    fn test_scenario_nested_completion() {
        let (mut stack, _) = stack();
        let root = stack.start(NewProgress::new("Root").total(2));

        let child1 = stack.start(NewProgress::new("Child1").parent(root));
        stack.complete(child1, Completion::new());
        assert_eq!(stack.node(root).unwrap().completed_operations, 1);
        assert_eq!(stack.node(root).unwrap().percent_complete, 50);

        let child2 = stack.start(NewProgress::new("Child2").parent(root));
        stack.complete(child2, Completion::new());
        assert_eq!(stack.node(root).unwrap().completed_operations, 2);

        stack.complete(root, Completion::new().status("All done"));

        assert_eq!(stack.live_count(), 0);
        assert_eq!(stack.tracked_count(), 0);
        for id in [root, child1, child2] {
            let node = stack.find(id).expect("retained in history");
            let completed = node.completed_at.expect("completed");
            assert!(completed >= node.started_at);
        }
        assert_eq!(stack.stats().warnings, 0);
    }

    #[test]
    fn test_scenario_nonexistent_parent_becomes_root() {
        let (mut stack, captured) = stack();
        let id = stack.start(NewProgress::new("Orphan").parent(ProgressId(4242)));

        let node = stack.node(id).unwrap();
        assert_eq!(node.parent_id, None);
        assert_eq!(stack.stats().warnings, 1);
        assert!(captured.contains("[WARNING]"));
        assert!(captured.contains("progress-4242"));
    }

    #[test]
    fn test_scenario_many_pairs_bounded() {
        let (sink, _) = LogSink::capture(LogLevel::Info);
        let mut stack = ProgressStack::new(sink, StackOptions::hidden().retention(16));

        for i in 0..1000 {
            let id = stack.start(NewProgress::new(format!("op {i}")));
            stack.complete(id, Completion::new());
        }

        assert_eq!(stack.live_count(), 0);
        assert_eq!(stack.tracked_count(), 0);
        assert_eq!(stack.history().count(), 16);
        assert_eq!(stack.stats().started, 1000);
        assert_eq!(stack.stats().completed, 1000);
    }

    #[test]
    fn test_completed_parent_keeps_children_visible() {
        let (mut stack, _) = stack();
        let root = stack.start(NewProgress::new("Root"));
        let child = stack.start(NewProgress::new("Child").parent(root));
        let grandchild = stack.start(NewProgress::new("Grandchild").parent(child));

        stack.complete(root, Completion::new());

        let frame = stack.frame();
        assert_eq!(frame.len(), 3);
        assert!(frame[0].completed);
        assert_eq!(frame[1].id, child);
        assert_eq!(frame[2].id, grandchild);
        assert_eq!(frame[2].depth, 2);

        stack.complete(grandchild, Completion::new());
        let frame = stack.frame();
        assert_eq!(frame.len(), 2);

        stack.complete(child, Completion::new());
        assert!(stack.frame().is_empty());
        assert_eq!(stack.tracked_count(), 0);
    }

    #[test]
    fn test_completed_anchor_accepts_new_children() {
        let (mut stack, _) = stack();
        let root = stack.start(NewProgress::new("Root"));
        let child = stack.start(NewProgress::new("Child").parent(root));
        stack.complete(root, Completion::new());

        let late = stack.start(NewProgress::new("Late").parent(root));
        assert_eq!(stack.node(late).unwrap().parent_id, Some(root));
        assert_eq!(stack.stats().warnings, 0);

        let frame = stack.frame();
        let ids: Vec<ProgressId> = frame.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![root, child, late]);
        assert_eq!(frame[2].depth, 1);

        // The anchor stays until its last child completes
        stack.complete(child, Completion::new());
        assert!(stack.node(root).is_some());
        stack.complete(late, Completion::new());
        assert_eq!(stack.tracked_count(), 0);
        assert!(ancestors_terminate(&stack));
    }

    #[test]
    fn test_retired_parent_renders_as_root() {
        let (mut stack, _) = stack();
        let root = stack.start(NewProgress::new("Root"));
        stack.complete(root, Completion::new());
        assert!(stack.node(root).is_none());

        let late = stack.start(NewProgress::new("Late").parent(root));
        assert_eq!(stack.node(late).unwrap().parent_id, Some(root));
        assert_eq!(stack.stats().warnings, 0);

        let frame = stack.frame();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame[0].depth, 0);
        assert!(ancestors_terminate(&stack));

        stack.complete(late, Completion::new());
        assert_eq!(stack.tracked_count(), 0);
    }

    #[test]
    fn test_huge_totals_do_not_overflow() {
        let (mut stack, _) = stack();
        let root = stack.start(NewProgress::new("Root").total(u64::MAX));
        stack.update(root, ProgressUpdate::new().completed_operations(u64::MAX / 2));
        assert_eq!(stack.node(root).unwrap().percent_complete, 49);

        stack.update(root, ProgressUpdate::new().completed_operations(u64::MAX));
        let child = stack.start(NewProgress::new("Child").parent(root));
        stack.complete(child, Completion::new());
        let node = stack.node(root).unwrap();
        assert_eq!(node.completed_operations, u64::MAX);
        assert_eq!(node.percent_complete, 100);
        assert_eq!(stack.stats().warnings, 0);
    }

    #[test]
    fn test_unknown_id_is_soft_noop() {
        let (mut stack, captured) = stack();
        let root = stack.start(NewProgress::new("Root").status("working"));
        let before = stack.frame();

        stack.update(ProgressId(999), ProgressUpdate::new().percent(50).status("x"));
        stack.complete(ProgressId(999), Completion::new().status("done"));

        assert_eq!(stack.frame(), before);
        assert!(stack.is_live(root));
        assert_eq!(stack.stats().warnings, 2);
        assert_eq!(stack.stats().completed, 0);
        assert!(captured.contains("unknown progress id progress-999"));
    }

    #[test]
    fn test_double_complete_is_soft_noop() {
        let (mut stack, captured) = stack();
        let id = stack.start(NewProgress::new("Once"));
        stack.complete(id, Completion::new());
        stack.complete(id, Completion::new());
        stack.update(id, ProgressUpdate::new().percent(10));

        assert_eq!(stack.stats().completed, 1);
        assert_eq!(stack.stats().warnings, 2);
        assert!(captured.contains("already completed"));
        assert_eq!(stack.find(id).unwrap().percent_complete, 100);
    }

    #[test]
    fn test_percent_is_clamped() {
        let (mut stack, _) = stack();
        let id = stack.start(NewProgress::new("Clamp"));

        stack.update(id, ProgressUpdate::new().percent(-10));
        assert_eq!(stack.node(id).unwrap().percent_complete, 0);

        stack.update(id, ProgressUpdate::new().percent(150));
        assert_eq!(stack.node(id).unwrap().percent_complete, 100);
        assert_eq!(stack.stats().warnings, 0);
    }

    #[test]
    fn test_update_merges_metrics_and_status() {
        let (mut stack, _) = stack();
        let id = stack.start(NewProgress::new("Scan").metric("items", 3));

        stack.update(id, ProgressUpdate::new().status("halfway").metric("failed", 1));
        stack.complete(id, Completion::new().metric("items", 4));

        let node = stack.find(id).unwrap();
        assert_eq!(node.status.as_deref(), Some("halfway"));
        assert_eq!(node.metrics["items"], serde_json::Value::from(4));
        assert_eq!(node.metrics["failed"], serde_json::Value::from(1));
    }

    #[test]
    fn test_completed_operations_update_derives_percent() {
        let (mut stack, _) = stack();
        let id = stack.start(NewProgress::new("Steps").total(4));
        stack.update(id, ProgressUpdate::new().completed_operations(3));
        assert_eq!(stack.node(id).unwrap().percent_complete, 75);

        stack.update(id, ProgressUpdate::new().completed_operations(9));
        assert_eq!(stack.node(id).unwrap().completed_operations, 4);
    }

    #[test]
    fn test_empty_log_has_no_effect() {
        let (mut stack, captured) = stack();
        let _id = stack.start(NewProgress::new("Busy"));
        let emitted = stack.sink().emitted();

        stack.log("", LogLevel::Info, None);
        stack.log("  ", LogLevel::Error, None);

        assert!(captured.lines().is_empty());
        assert_eq!(stack.sink().emitted(), emitted);
        assert_eq!(stack.stats().warnings, 0);
    }

    #[test]
    fn test_log_indents_under_progress_node() {
        let (mut stack, captured) = stack();
        let root = stack.start(NewProgress::new("Root"));
        let child = stack.start(NewProgress::new("Child").parent(root));

        stack.log("inside child", LogLevel::Info, Some(child));
        stack.log("unknown node", LogLevel::Info, Some(ProgressId(77)));

        let lines = captured.lines();
        assert_eq!(lines[0], "  [INFO] inside child");
        assert_eq!(lines[1], "[INFO] unknown node");
    }

    #[test]
    fn test_verbose_filtered_before_render() {
        let (sink, captured) = LogSink::capture(LogLevel::Info);
        let mut stack = ProgressStack::hidden(sink);
        stack.verbose("hidden detail");
        assert!(captured.lines().is_empty());
    }

    #[test]
    fn test_force_complete_all_leaves_first() {
        let (mut stack, _) = stack();
        let root = stack.start(NewProgress::new("Root").total(2));
        let a = stack.start(NewProgress::new("A").parent(root));
        let _b = stack.start(NewProgress::new("B").parent(a));

        assert_eq!(stack.force_complete_all(), 3);
        assert_eq!(stack.live_count(), 0);
        assert_eq!(stack.tracked_count(), 0);

        let order: Vec<&str> = stack.history().map(|n| n.activity.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "Root"]);

        let root_node = stack.find(root).unwrap();
        let a_node = stack.find(a).unwrap();
        assert!(root_node.completed_at.unwrap() >= a_node.completed_at.unwrap());
        assert_eq!(root_node.metrics["forced"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_empty_activity_uses_placeholder() {
        let (mut stack, _) = stack();
        let id = stack.start(NewProgress::new("   "));
        assert_eq!(stack.node(id).unwrap().activity, FALLBACK_ACTIVITY);
        assert_eq!(stack.stats().warnings, 1);
    }

    #[test]
    fn test_forest_invariant_holds_across_operations() {
        let (mut stack, _) = stack();
        let r1 = stack.start(NewProgress::new("r1"));
        let c1 = stack.start(NewProgress::new("c1").parent(r1));
        let r2 = stack.start(NewProgress::new("r2"));
        let c2 = stack.start(NewProgress::new("c2").parent(c1));
        assert!(ancestors_terminate(&stack));

        stack.complete(r1, Completion::new());
        assert!(ancestors_terminate(&stack));
        let c3 = stack.start(NewProgress::new("c3").parent(r2));
        stack.complete(c1, Completion::new());
        assert!(ancestors_terminate(&stack));
        stack.complete(c2, Completion::new());
        stack.complete(c3, Completion::new());
        assert!(ancestors_terminate(&stack));
        assert_eq!(stack.live_count(), 1);
    }

    #[test]
    fn test_scoped_completes_on_error() {
        let (mut stack, _) = stack();
        let mut seen = None;
        let result: Result<(), String> = stack.scoped(NewProgress::new("Fails"), |s, id| {
            seen = Some(id);
            s.update(id, ProgressUpdate::new().percent(30));
            Err("boom".to_string())
        });

        assert!(result.is_err());
        let node = stack.find(seen.unwrap()).unwrap();
        assert_eq!(node.status.as_deref(), Some("Failed: boom"));
        assert_eq!(stack.live_count(), 0);
        assert_eq!(stack.stats().warnings, 0);
    }

    #[test]
    fn test_plain_mode_logs_start_and_completion() {
        let (sink, captured) = LogSink::capture(LogLevel::Info);
        let options = StackOptions {
            mode: RenderMode::Plain,
            retention: 4,
        };
        let mut stack = ProgressStack::new(sink, options);
        let id = stack.start(NewProgress::new("Packages"));
        stack.complete(id, Completion::new().status("3 installed"));

        let lines = captured.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "[INFO] Packages");
        assert!(lines[1].starts_with("[SUCCESS] Packages: 3 installed ("));
    }
}
