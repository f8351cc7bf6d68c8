//! Execution plan - the set of items a run operates on

use crate::item::{BoxedItem, ConfigurationItem};

/// Items selected for a run, in document order
pub struct ExecutionPlan {
    pub items: Vec<BoxedItem>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add an item to the plan
    pub fn add_item(&mut self, item: BoxedItem) {
        self.items.push(item);
    }

    /// Filter plan to only include items matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn ConfigurationItem) -> bool,
    {
        Self {
            items: self
                .items
                .into_iter()
                .filter(|i| predicate(i.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include items matching a target pattern
    ///
    /// Target format: "kind" or "kind.name". Kind aliases should be
    /// resolved by the caller before filtering.
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                self.filter(|i| matches_filter(i, kind.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of items in the plan
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items that need administrator rights to apply
    pub fn elevated_count(&self) -> usize {
        self.items.iter().filter(|i| i.requires_elevation()).count()
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<BoxedItem>> for ExecutionPlan {
    fn from(items: Vec<BoxedItem>) -> Self {
        Self { items }
    }
}

/// Parse a target string like "kind.name" into (kind, name)
///
/// Only the first dot separates kind from name, so names may contain dots.
pub fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((kind, name)) if !kind.is_empty() => (Some(kind.to_string()), Some(name.to_string())),
        Some(_) => (None, Some(target.trim_start_matches('.').to_string())),
    }
}

/// Check if an item matches the filter criteria
fn matches_filter(item: &dyn ConfigurationItem, kind: Option<&str>, name: Option<&str>) -> bool {
    if let Some(k) = kind
        && item.kind() != k
        && !item.kind().starts_with(k)
    {
        return false;
    }

    if let Some(n) = name
        && !item.name().contains(n)
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApplyContext;
    use crate::types::{ApplyResult, ItemState};
    use anyhow::Result;

    #[derive(Debug)]
    struct Named(&'static str, &'static str, bool);

    impl ConfigurationItem for Named {
        fn name(&self) -> String {
            self.1.to_string()
        }
        fn kind(&self) -> &'static str {
            self.0
        }
        fn description(&self) -> String {
            String::new()
        }
        fn requires_elevation(&self) -> bool {
            self.2
        }
        fn current_state(&self) -> Result<ItemState> {
            Ok(ItemState::Unknown)
        }
        fn desired_state(&self) -> ItemState {
            ItemState::Unknown
        }
        fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
            Ok(ApplyResult::NoChange)
        }
    }

    fn plan() -> ExecutionPlan {
        ExecutionPlan::from(vec![
            Box::new(Named("packages", "dev-tools", false)) as BoxedItem,
            Box::new(Named("registry", "explorer.show-extensions", false)),
            Box::new(Named("registry", "telemetry", true)),
            Box::new(Named("terminal", "default-profile", false)),
        ])
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("registry"), (Some("registry".to_string()), None));
        assert_eq!(
            parse_target("registry.telemetry"),
            (Some("registry".to_string()), Some("telemetry".to_string()))
        );
        assert_eq!(
            parse_target("registry.explorer.show-extensions"),
            (
                Some("registry".to_string()),
                Some("explorer.show-extensions".to_string())
            )
        );
        assert_eq!(parse_target(".telemetry"), (None, Some("telemetry".to_string())));
    }

    #[test]
    fn test_filter_by_kind() {
        let filtered = plan().filter_by_target(Some("registry"));
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.elevated_count(), 1);
    }

    #[test]
    fn test_filter_by_kind_and_name() {
        let filtered = plan().filter_by_target(Some("registry.explorer"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.items[0].name(), "explorer.show-extensions");
    }

    #[test]
    fn test_no_target_keeps_everything() {
        assert_eq!(plan().filter_by_target(None).len(), 4);
    }
}
