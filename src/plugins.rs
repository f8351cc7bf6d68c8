//! Plugins: named bundles of extra recommendation rules
//!
//! The set of plugins is fixed at build time. The [`PluginManager`] keeps
//! them by name and tracks which are loaded; only loaded plugins contribute
//! rules to the recommendation engine.

use crate::config::ItemSpec;
use crate::recommend::rules::{SimpleRule, registry_spec};
use crate::recommend::{Priority, Recommendation, Rule, SystemProfile};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error("unknown plugin '{0}'")]
    NotFound(String),

    #[error("plugin '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("plugin '{0}' is already loaded")]
    AlreadyLoaded(String),

    #[error("plugin '{0}' is not loaded")]
    NotLoaded(String),

    #[error("plugin '{name}' failed to initialise: {reason}")]
    InitFailed { name: String, reason: String },
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str;

    /// Called before the plugin's rules are used. An error leaves it unloaded.
    fn on_load(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn on_unload(&mut self) {}

    fn rules(&self) -> Vec<Box<dyn Rule>>;
}

/// Listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub rules: usize,
    pub loaded: bool,
}

#[derive(Default)]
pub struct PluginManager {
    plugins: BTreeMap<String, Box<dyn Plugin>>,
    loaded: BTreeSet<String>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager with every built-in plugin registered, none loaded
    pub fn with_builtins() -> Self {
        let mut manager = Self::new();
        for plugin in builtin() {
            if let Err(e) = manager.register(plugin) {
                log::warn!("built-in plugin skipped: {e}");
            }
        }
        manager
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), PluginError> {
        let name = plugin.name().to_string();
        if self.plugins.contains_key(&name) {
            return Err(PluginError::AlreadyRegistered(name));
        }
        self.plugins.insert(name, plugin);
        Ok(())
    }

    pub fn load(&mut self, name: &str) -> Result<(), PluginError> {
        let plugin = self
            .plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        if self.loaded.contains(name) {
            return Err(PluginError::AlreadyLoaded(name.to_string()));
        }
        plugin
            .on_load()
            .map_err(|reason| PluginError::InitFailed {
                name: name.to_string(),
                reason,
            })?;
        self.loaded.insert(name.to_string());
        log::info!("Loaded plugin {name}");
        Ok(())
    }

    /// Load each named plugin, collecting failures instead of stopping
    pub fn load_all<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<PluginError> {
        names
            .iter()
            .filter_map(|name| self.load(name.as_ref()).err())
            .collect()
    }

    pub fn unload(&mut self, name: &str) -> Result<(), PluginError> {
        let plugin = self
            .plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        if !self.loaded.remove(name) {
            return Err(PluginError::NotLoaded(name.to_string()));
        }
        plugin.on_unload();
        log::info!("Unloaded plugin {name}");
        Ok(())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    /// A loaded plugin by name
    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        if !self.is_loaded(name) {
            return None;
        }
        self.plugins.get(name).map(|p| &**p)
    }

    pub fn list(&self) -> Vec<PluginInfo> {
        self.plugins
            .values()
            .map(|p| PluginInfo {
                name: p.name().to_string(),
                version: p.version().to_string(),
                description: p.description().to_string(),
                rules: p.rules().len(),
                loaded: self.is_loaded(p.name()),
            })
            .collect()
    }

    /// Rules of every loaded plugin
    pub fn rules(&self) -> Vec<Box<dyn Rule>> {
        self.loaded
            .iter()
            .filter_map(|name| self.plugins.get(name))
            .flat_map(|p| p.rules())
            .collect()
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        for name in std::mem::take(&mut self.loaded) {
            if let Some(plugin) = self.plugins.get_mut(&name) {
                plugin.on_unload();
            }
        }
    }
}

pub fn builtin() -> Vec<Box<dyn Plugin>> {
    vec![Box::new(DeveloperPlugin), Box::new(PrivacyPlugin)]
}

/// Tooling suggestions for machines that already have developer packages
struct DeveloperPlugin;

impl Plugin for DeveloperPlugin {
    fn name(&self) -> &str {
        "developer"
    }

    fn description(&self) -> &str {
        "Terminal and shell tooling for development machines"
    }

    fn rules(&self) -> Vec<Box<dyn Rule>> {
        vec![
            Box::new(SimpleRule::new("developer-terminal", |profile| {
                missing_package(
                    profile,
                    "Microsoft.WindowsTerminal",
                    "Install Windows Terminal",
                    0.8,
                )
            })),
            Box::new(SimpleRule::new("developer-pwsh", |profile| {
                missing_package(profile, "Microsoft.PowerShell", "Install PowerShell 7", 0.7)
            })),
        ]
    }
}

fn missing_package(
    profile: &SystemProfile,
    id: &str,
    title: &str,
    confidence: f64,
) -> Option<Recommendation> {
    let software = &profile.software;
    if !software.winget || !software.has_package("Git.Git") || software.has_package(id) {
        return None;
    }
    let slug = format!("install-{}", id.to_ascii_lowercase().replace('.', "-"));
    let spec = ItemSpec::new(&slug, "packages")
        .property("packages", vec![id])
        .property("manager", "winget");
    Some(
        Recommendation::new(slug, title, "development", Priority::Medium, spec)
            .description(format!("{id} is not installed."))
            .confidence(confidence)
            .prerequisite("winget")
            .meta("plugin", "developer"),
    )
}

/// Stricter privacy settings than the built-in rules
struct PrivacyPlugin;

impl Plugin for PrivacyPlugin {
    fn name(&self) -> &str {
        "privacy"
    }

    fn description(&self) -> &str {
        "Minimal diagnostic data and no advertising id"
    }

    fn rules(&self) -> Vec<Box<dyn Rule>> {
        vec![
            Box::new(SimpleRule::new("privacy-telemetry-off", |profile| {
                let level = profile.settings.telemetry_level?;
                if level == 0 {
                    return None;
                }
                let spec = registry_spec(
                    "telemetry-security-only",
                    r"HKLM\SOFTWARE\Policies\Microsoft\Windows\DataCollection",
                    json!({ "AllowTelemetry": 0 }),
                );
                Some(
                    Recommendation::new(
                        "telemetry-security-only",
                        "Send security diagnostic data only",
                        "privacy",
                        Priority::Medium,
                        spec,
                    )
                    .description("Level 0 is honoured on Enterprise and Education editions.")
                    .confidence(0.6)
                    .prerequisite("administrator")
                    .effect("telemetry.level", 0)
                    .meta("plugin", "privacy"),
                )
            })),
            Box::new(SimpleRule::new("privacy-advertising-id", |_| {
                let spec = registry_spec(
                    "disable-advertising-id",
                    r"HKCU\Software\Microsoft\Windows\CurrentVersion\AdvertisingInfo",
                    json!({ "Enabled": 0 }),
                );
                Some(
                    Recommendation::new(
                        "disable-advertising-id",
                        "Disable the advertising id",
                        "privacy",
                        Priority::Low,
                        spec,
                    )
                    .confidence(0.6)
                    .effect("privacy.advertisingId", false)
                    .meta("plugin", "privacy"),
                )
            })),
        ]
    }
}
