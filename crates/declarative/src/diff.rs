//! Diff computation for configuration items

use crate::item::ConfigurationItem;
use crate::types::ItemState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A diff between current and desired state of an item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDiff {
    pub name: String,
    pub kind: String,
    pub description: String,
    pub current: ItemState,
    pub desired: ItemState,
    /// Whether applying this item needs administrator rights
    pub requires_elevation: bool,
}

impl ItemDiff {
    /// Create a diff from an item, returning None if no changes needed
    pub fn from_item(item: &dyn ConfigurationItem) -> Result<Option<Self>> {
        let current = item.current_state()?;
        let desired = item.desired_state();

        if current == desired {
            return Ok(None);
        }

        Ok(Some(Self {
            name: item.name(),
            kind: item.kind().to_string(),
            description: item.description(),
            current,
            desired,
            requires_elevation: item.requires_elevation(),
        }))
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ItemState::Absent, ItemState::Present { .. })
        )
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ItemState::Present { .. }, ItemState::Absent)
        )
    }
}

/// Compute diffs for a list of items
///
/// Items whose state cannot be read are reported separately as
/// `(name, error)` so one broken item does not hide the others.
pub fn compute_diffs(items: &[Box<dyn ConfigurationItem>]) -> (Vec<ItemDiff>, Vec<(String, String)>) {
    let mut diffs = Vec::new();
    let mut errors = Vec::new();
    for item in items {
        match ItemDiff::from_item(item.as_ref()) {
            Ok(Some(diff)) => diffs.push(diff),
            Ok(None) => {}
            Err(e) => errors.push((item.name(), format!("{e:#}"))),
        }
    }
    (diffs, errors)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of items to add
    pub additions: usize,
    /// Number of items to remove
    pub removals: usize,
    /// Number of items to modify
    pub modifications: usize,
    /// Number of items requiring elevation
    pub elevation_required: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ItemDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
            if diff.requires_elevation {
                summary.elevation_required += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by item kind
pub fn group_by_kind(diffs: &[ItemDiff]) -> BTreeMap<String, Vec<&ItemDiff>> {
    let mut groups: BTreeMap<String, Vec<&ItemDiff>> = BTreeMap::new();
    for diff in diffs {
        groups.entry(diff.kind.clone()).or_default().push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(kind: &str, current: ItemState, desired: ItemState, elevated: bool) -> ItemDiff {
        ItemDiff {
            name: "x".into(),
            kind: kind.into(),
            description: String::new(),
            current,
            desired,
            requires_elevation: elevated,
        }
    }

    #[test]
    fn test_diff_summary() {
        let present = ItemState::Present { details: None };
        let diffs = vec![
            diff("packages", ItemState::Absent, present.clone(), false),
            diff("bloatware", present.clone(), ItemState::Absent, true),
            diff(
                "registry",
                ItemState::Modified {
                    from: "0".into(),
                    to: "1".into(),
                },
                present,
                false,
            ),
        ];

        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.modifications, 1);
        assert_eq!(summary.elevation_required, 1);
        assert!(summary.has_changes());

        let groups = group_by_kind(&diffs);
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["bloatware", "packages", "registry"]);
    }
}
