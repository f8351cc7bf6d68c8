//! Execution planner - documents to filtered plans

use crate::config::ConfigDocument;
use crate::items;
use declarative::ExecutionPlan;

/// Build the plan for a document, keeping only items matching `target`.
///
/// Kind aliases in the target (`reg`, `wt`, ...) are resolved first.
pub fn build_plan(doc: &ConfigDocument, target: Option<&str>) -> ExecutionPlan {
    let target = target.map(items::normalize_target);
    ExecutionPlan::from(items::build_items(doc)).filter_by_target(target.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ItemSpec;
    use serde_json::json;

    fn doc() -> ConfigDocument {
        ConfigDocument {
            name: "dev".into(),
            items: vec![
                ItemSpec::new("dev-tools", "packages").property("packages", vec!["Git.Git"]),
                ItemSpec::new("dark-mode", "registry")
                    .property("path", "HKCU:\\Software\\Test")
                    .property("values", json!({"AppsUseLightTheme": 0})),
                ItemSpec::new("policies", "registry")
                    .property("path", "HKLM:\\SOFTWARE\\Policies\\Test")
                    .property("values", json!({"Enabled": 1})),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_by_alias() {
        let plan = build_plan(&doc(), Some("reg"));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.elevated_count(), 1);
    }

    #[test]
    fn test_plan_by_kind_and_name() {
        let plan = build_plan(&doc(), Some("reg.dark"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.items[0].name(), "dark-mode");
    }

    #[test]
    fn test_plan_without_target() {
        assert_eq!(build_plan(&doc(), None).len(), 3);
    }
}
