//! Frame computation and console drawing for the progress forest.
//!
//! Every mutation recomputes the whole frame from the tracked nodes. Depth
//! is derived by walking parent links each time instead of being cached.

use super::node::{ProgressId, ProgressNode};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::BTreeMap;

const BAR_TEMPLATE: &str = "{prefix}{bar:24.cyan/blue} {pos:>3}% {msg}";
const DONE_TEMPLATE: &str = "{prefix}{msg}";

/// How the stack presents progress on the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Nested bars redrawn in place on stderr
    Interactive,
    /// One plain line when a node starts and when it completes
    Plain,
    /// Nothing is drawn
    Hidden,
}

impl RenderMode {
    /// Interactive on a terminal, plain otherwise
    pub fn detect() -> Self {
        if console::Term::stderr().is_term() {
            Self::Interactive
        } else {
            Self::Plain
        }
    }
}

/// One visible row of the progress display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLine {
    /// Node drawn on this row
    pub id: ProgressId,
    /// Indentation level
    pub depth: usize,
    /// Node activity
    pub activity: String,
    /// Node status
    pub status: Option<String>,
    /// 0..=100
    pub percent: u8,
    /// Completed anchor kept for its children
    pub completed: bool,
    /// `(completed, total)` when the node counts steps
    pub steps: Option<(u64, u64)>,
}

impl FrameLine {
    /// Activity, status and step counter as one label
    pub fn label(&self) -> String {
        let mut label = self.activity.clone();
        if let Some(status) = &self.status {
            label.push_str(": ");
            label.push_str(status);
        }
        if let Some((done, total)) = self.steps {
            label.push_str(&format!(" ({done}/{total})"));
        }
        label
    }

    /// Plain-text rendering used for non-interactive output and tests
    pub fn text(&self) -> String {
        let marker = if self.completed { "✓" } else { "→" };
        format!(
            "{}{} {} [{:>3}%]",
            "  ".repeat(self.depth),
            marker,
            self.label(),
            self.percent
        )
    }
}

/// Number of ancestors above `id`
pub fn depth_of(nodes: &BTreeMap<ProgressId, ProgressNode>, id: ProgressId) -> usize {
    let mut depth = 0;
    let mut current = nodes.get(&id).and_then(|n| n.parent_id);
    // A retired parent is no longer tracked and ends the chain
    while let Some(node) = current.and_then(|parent| nodes.get(&parent)) {
        if depth > nodes.len() {
            break;
        }
        depth += 1;
        current = node.parent_id;
    }
    depth
}

/// Compute the full frame: roots in creation order, each followed by its
/// subtree with children in creation order.
pub fn build_frame(nodes: &BTreeMap<ProgressId, ProgressNode>) -> Vec<FrameLine> {
    let mut children: BTreeMap<ProgressId, Vec<ProgressId>> = BTreeMap::new();
    let mut roots = Vec::new();

    // BTreeMap iterates ids in ascending order, which is creation order
    for node in nodes.values() {
        match node.parent_id {
            Some(parent) if nodes.contains_key(&parent) => {
                children.entry(parent).or_default().push(node.id);
            }
            _ => roots.push(node.id),
        }
    }

    let mut frame = Vec::with_capacity(nodes.len());
    let mut pending: Vec<ProgressId> = roots.into_iter().rev().collect();

    while let Some(id) = pending.pop() {
        let Some(node) = nodes.get(&id) else {
            continue;
        };
        frame.push(FrameLine {
            id,
            depth: depth_of(nodes, id),
            activity: node.activity.clone(),
            status: node.status.clone(),
            percent: node.percent_complete,
            completed: !node.is_live(),
            steps: node
                .total_operations
                .map(|total| (node.completed_operations, total)),
        });
        if let Some(kids) = children.get(&id) {
            pending.extend(kids.iter().rev());
        }
    }

    frame
}

/// Draws frames onto an indicatif multi-bar
pub(crate) struct Renderer {
    mode: RenderMode,
    multi: MultiProgress,
    bars: Vec<ProgressBar>,
}

impl Renderer {
    pub(crate) fn new(mode: RenderMode) -> Self {
        let multi = match mode {
            RenderMode::Interactive => MultiProgress::new(),
            RenderMode::Plain | RenderMode::Hidden => {
                MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
            }
        };
        Self {
            mode,
            multi,
            bars: Vec::new(),
        }
    }

    pub(crate) fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Shared handle to the draw target, for coordinating other writers
    pub(crate) fn draw_target(&self) -> MultiProgress {
        self.multi.clone()
    }

    /// Replace whatever is on screen with `frame`
    pub(crate) fn draw(&mut self, frame: &[FrameLine]) {
        if self.mode != RenderMode::Interactive {
            return;
        }

        while self.bars.len() < frame.len() {
            let bar = self.multi.add(ProgressBar::new(100));
            self.bars.push(bar);
        }
        while self.bars.len() > frame.len() {
            if let Some(bar) = self.bars.pop() {
                bar.finish_and_clear();
                self.multi.remove(&bar);
            }
        }

        for (bar, line) in self.bars.iter().zip(frame) {
            bar.set_style(style_for(line));
            bar.set_prefix("  ".repeat(line.depth));
            bar.set_position(u64::from(line.percent));
            if line.completed {
                bar.set_message(format!("✓ {}", line.label()));
            } else {
                bar.set_message(line.label());
            }
        }
    }

    /// Run `f` with the frame cleared, redrawing it afterwards
    pub(crate) fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        if self.bars.is_empty() {
            f()
        } else {
            self.multi.suspend(f)
        }
    }

    /// Remove every bar from the screen
    pub(crate) fn clear(&mut self) {
        for bar in self.bars.drain(..) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}

fn style_for(line: &FrameLine) -> ProgressStyle {
    let template = if line.completed {
        DONE_TEMPLATE
    } else {
        BAR_TEMPLATE
    };
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::node::NewProgress;

    fn tree(specs: &[(u64, Option<u64>)]) -> BTreeMap<ProgressId, ProgressNode> {
        specs
            .iter()
            .map(|(id, parent)| {
                let node = ProgressNode::new(
                    ProgressId(*id),
                    NewProgress::new(format!("node {id}")),
                    parent.map(ProgressId),
                );
                (ProgressId(*id), node)
            })
            .collect()
    }

    #[test]
    fn test_depth_walks_parent_chain() {
        let nodes = tree(&[(1, None), (2, Some(1)), (3, Some(2)), (4, None)]);
        assert_eq!(depth_of(&nodes, ProgressId(1)), 0);
        assert_eq!(depth_of(&nodes, ProgressId(2)), 1);
        assert_eq!(depth_of(&nodes, ProgressId(3)), 2);
        assert_eq!(depth_of(&nodes, ProgressId(4)), 0);
        assert_eq!(depth_of(&nodes, ProgressId(99)), 0);
    }

    #[test]
    fn test_untracked_parent_counts_as_root() {
        let nodes = tree(&[(3, Some(1)), (4, Some(3))]);
        assert_eq!(depth_of(&nodes, ProgressId(3)), 0);
        assert_eq!(depth_of(&nodes, ProgressId(4)), 1);

        let depths: Vec<usize> = build_frame(&nodes).iter().map(|l| l.depth).collect();
        assert_eq!(depths, vec![0, 1]);
    }

    #[test]
    fn test_frame_orders_children_under_parents() {
        // 1 ─┬─ 2 ── 5
        //    └─ 4
        // 3
        let nodes = tree(&[(1, None), (2, Some(1)), (3, None), (4, Some(1)), (5, Some(2))]);
        let frame = build_frame(&nodes);

        let order: Vec<u64> = frame.iter().map(|l| l.id.0).collect();
        assert_eq!(order, vec![1, 2, 5, 4, 3]);

        let depths: Vec<usize> = frame.iter().map(|l| l.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1, 0]);
    }

    #[test]
    fn test_frame_line_text() {
        let line = FrameLine {
            id: ProgressId(1),
            depth: 1,
            activity: "Packages".into(),
            status: Some("installing git".into()),
            percent: 50,
            completed: false,
            steps: Some((1, 2)),
        };
        assert_eq!(line.label(), "Packages: installing git (1/2)");
        assert_eq!(line.text(), "  → Packages: installing git (1/2) [ 50%]");
    }

    #[test]
    fn test_hidden_renderer_draws_nothing() {
        let mut renderer = Renderer::new(RenderMode::Hidden);
        let nodes = tree(&[(1, None)]);
        renderer.draw(&build_frame(&nodes));
        assert!(renderer.bars.is_empty());
        assert_eq!(renderer.suspend(|| 7), 7);
    }
}
