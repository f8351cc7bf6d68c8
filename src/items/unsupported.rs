//! Placeholder for entries that cannot be turned into a real item

use super::ItemKind;
use crate::config::ItemSpec;
use anyhow::{Result, bail};
use declarative::{ApplyContext, ApplyResult, ConfigurationItem, ItemState};

/// An entry with an unknown `type` or unreadable properties.
///
/// Loading always succeeds; test and apply report why the entry is unusable.
#[derive(Debug, Clone)]
pub struct UnsupportedItem {
    name: String,
    reason: String,
}

impl UnsupportedItem {
    pub fn unknown_type(spec: &ItemSpec) -> Self {
        Self {
            name: spec.name.clone(),
            reason: format!("unsupported item type '{}'", spec.kind),
        }
    }

    pub fn invalid(spec: &ItemSpec, kind: ItemKind, error: &anyhow::Error) -> Self {
        Self {
            name: spec.name.clone(),
            reason: format!("invalid {kind} item: {error:#}"),
        }
    }
}

impl ConfigurationItem for UnsupportedItem {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "unsupported"
    }

    fn description(&self) -> String {
        self.reason.clone()
    }

    fn current_state(&self) -> Result<ItemState> {
        bail!("{}", self.reason)
    }

    fn desired_state(&self) -> ItemState {
        ItemState::Unknown
    }

    fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
        bail!("{}", self.reason)
    }
}
