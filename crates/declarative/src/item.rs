//! ConfigurationItem trait for declarative state management
//!
//! A configuration item is a named unit of desired system state that can
//! test itself for compliance, report what it currently sees, and apply
//! the changes needed to converge.

use crate::context::ApplyContext;
use crate::types::{ApplyResult, ItemState};
use anyhow::Result;
use std::fmt;

/// Core trait for configuration items
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, ApplyResult, ConfigurationItem, ItemState};
///
/// #[derive(Debug)]
/// struct MarkerFile {
///     path: String,
/// }
///
/// impl ConfigurationItem for MarkerFile {
///     fn name(&self) -> String {
///         self.path.clone()
///     }
///
///     fn kind(&self) -> &'static str {
///         "file"
///     }
///
///     fn description(&self) -> String {
///         format!("Ensure {} exists", self.path)
///     }
///
///     fn current_state(&self) -> anyhow::Result<ItemState> {
///         if std::path::Path::new(&self.path).exists() {
///             Ok(ItemState::Present { details: None })
///         } else {
///             Ok(ItemState::Absent)
///         }
///     }
///
///     fn desired_state(&self) -> ItemState {
///         ItemState::Present { details: None }
///     }
///
///     fn apply(&self, ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
///         if ctx.dry_run {
///             return Ok(ApplyResult::Skipped { reason: "Dry run".into() });
///         }
///         std::fs::write(&self.path, "")?;
///         Ok(ApplyResult::Created)
///     }
/// }
/// ```
pub trait ConfigurationItem: Send + Sync + fmt::Debug {
    /// Name of the item as written in the configuration document
    fn name(&self) -> String;

    /// Item kind (e.g. "packages", "registry", "terminal")
    ///
    /// Used for grouping and target filtering.
    fn kind(&self) -> &'static str;

    /// Human-readable description of what this item does
    fn description(&self) -> String;

    /// Whether applying this item needs administrator rights
    fn requires_elevation(&self) -> bool {
        false
    }

    /// Snapshot of the state this item currently observes
    fn current_state(&self) -> Result<ItemState>;

    /// State the item converges to
    fn desired_state(&self) -> ItemState;

    /// Whether the system already complies with this item
    ///
    /// Default implementation compares current and desired states.
    fn test(&self) -> Result<bool> {
        Ok(self.current_state()? == self.desired_state())
    }

    /// Apply changes to reach the desired state
    ///
    /// This method should:
    /// 1. Check if already in desired state (return NoChange)
    /// 2. Respect ctx.dry_run (return Skipped if true)
    /// 3. Make the necessary changes
    /// 4. Return the appropriate ApplyResult
    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

/// A boxed item for type-erased storage
pub type BoxedItem = Box<dyn ConfigurationItem>;
