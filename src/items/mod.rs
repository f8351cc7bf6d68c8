//! Configuration item kinds
//!
//! Every entry of a document's `items` list becomes one boxed
//! [`ConfigurationItem`]. The set of kinds is closed: anything that does not
//! resolve to an [`ItemKind`] (or whose properties cannot be read) becomes an
//! [`UnsupportedItem`] that fails when tested, so a bad entry never stops
//! the rest of the document from loading.

mod bloatware;
mod packages;
mod powershell_profile;
mod registry;
mod terminal;
mod unsupported;

pub use bloatware::BloatwareItem;
pub use packages::{PackageManager, PackagesItem, parse_choco_list, parse_winget_list};
pub use powershell_profile::PowerShellProfileItem;
pub use registry::{RegValue, RegistryItem};
pub use terminal::TerminalItem;
pub use unsupported::UnsupportedItem;

use crate::config::{ConfigDocument, ItemSpec};
use anyhow::Result;
use declarative::BoxedItem;
use std::fmt;

/// Known item kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Packages,
    Bloatware,
    Registry,
    Terminal,
    PowerShellProfile,
}

impl ItemKind {
    pub const ALL: [Self; 5] = [
        Self::Packages,
        Self::Bloatware,
        Self::Registry,
        Self::Terminal,
        Self::PowerShellProfile,
    ];

    /// Canonical name, as reported by `ConfigurationItem::kind`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Packages => "packages",
            Self::Bloatware => "bloatware",
            Self::Registry => "registry",
            Self::Terminal => "terminal",
            Self::PowerShellProfile => "powershell_profile",
        }
    }

    /// Resolve a `type` value or alias, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "packages" | "package" | "winget" | "choco" | "apps" => Some(Self::Packages),
            "bloatware" | "appx" | "debloat" => Some(Self::Bloatware),
            "registry" | "reg" => Some(Self::Registry),
            "terminal" | "windows_terminal" | "windowsterminal" | "wt" => Some(Self::Terminal),
            "powershell_profile" | "powershellprofile" | "psprofile" | "profile" => {
                Some(Self::PowerShellProfile)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rewrite the kind part of a `kind[.name]` target to its canonical name
pub fn normalize_target(target: &str) -> String {
    let (kind, rest) = match target.split_once('.') {
        Some((kind, rest)) => (kind, Some(rest)),
        None => (target, None),
    };
    let kind = ItemKind::parse(kind).map_or_else(|| kind.to_string(), |k| k.as_str().to_string());
    match rest {
        Some(rest) => format!("{kind}.{rest}"),
        None => kind,
    }
}

/// Build the item described by one document entry
pub fn build_item(spec: &ItemSpec) -> BoxedItem {
    let Some(kind) = ItemKind::parse(&spec.kind) else {
        log::debug!("Unknown item type '{}' for {}", spec.kind, spec.name);
        return Box::new(UnsupportedItem::unknown_type(spec));
    };

    match build_known(kind, spec) {
        Ok(item) => item,
        Err(e) => {
            log::debug!("Invalid {} item {}: {:#}", kind, spec.name, e);
            Box::new(UnsupportedItem::invalid(spec, kind, &e))
        }
    }
}

fn build_known(kind: ItemKind, spec: &ItemSpec) -> Result<BoxedItem> {
    Ok(match kind {
        ItemKind::Packages => Box::new(PackagesItem::from_spec(spec)?),
        ItemKind::Bloatware => Box::new(BloatwareItem::from_spec(spec)?),
        ItemKind::Registry => Box::new(RegistryItem::from_spec(spec)?),
        ItemKind::Terminal => Box::new(TerminalItem::from_spec(spec)?),
        ItemKind::PowerShellProfile => Box::new(PowerShellProfileItem::from_spec(spec)?),
    })
}

/// Build every item of a document, in document order
pub fn build_items(doc: &ConfigDocument) -> Vec<BoxedItem> {
    doc.items.iter().map(build_item).collect()
}

/// Description from the document, or a generated one
pub(crate) fn describe(spec: &ItemSpec, fallback: impl FnOnce() -> String) -> String {
    spec.description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map_or_else(fallback, str::to_string)
}
