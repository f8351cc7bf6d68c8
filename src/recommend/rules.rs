//! Built-in recommendation rules

use super::profile::SystemProfile;
use super::{Priority, Recommendation};
use crate::config::ItemSpec;
use serde_json::{Value, json};

const EXPLORER_ADVANCED: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\Advanced";
const PERSONALIZE: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Themes\Personalize";
const DATA_COLLECTION: &str = r"HKLM\SOFTWARE\Policies\Microsoft\Windows\DataCollection";
const APP_MODEL_UNLOCK: &str = r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\AppModelUnlock";
const VISUAL_EFFECTS: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\VisualEffects";
const STORAGE_SENSE: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\StorageSense\Parameters\StoragePolicy";

/// Memory below this many GB counts as constrained
pub const LOW_MEMORY_GB: f64 = 8.0;
/// Free disk below this share (percent) is worth acting on
pub const LOW_DISK_PERCENT: f64 = 15.0;
/// Free disk below this share (percent) is critical
pub const CRITICAL_DISK_PERCENT: f64 = 5.0;

/// Packages whose presence marks a developer machine
const DEV_TOOLS: &[&str] = &[
    "Git.Git",
    "Microsoft.VisualStudioCode",
    "Microsoft.VisualStudio.2022.Community",
    "Python.Python.3.12",
    "OpenJS.NodeJS",
    "Rustlang.Rustup",
    "git",
    "vscode",
    "nodejs",
];

/// A check that turns a profile into zero or more recommendations
pub trait Rule: Send + Sync {
    fn id(&self) -> &str;

    fn evaluate(&self, profile: &SystemProfile) -> Vec<Recommendation>;
}

/// Registry item spec setting `values` under `key`
pub fn registry_spec(name: &str, key: &str, values: Value) -> ItemSpec {
    ItemSpec::new(name, "registry")
        .property("path", key)
        .property("values", values)
}

/// A rule that yields at most one recommendation
pub struct SimpleRule {
    id: &'static str,
    check: fn(&SystemProfile) -> Option<Recommendation>,
}

impl SimpleRule {
    pub const fn new(id: &'static str, check: fn(&SystemProfile) -> Option<Recommendation>) -> Self {
        Self { id, check }
    }
}

impl Rule for SimpleRule {
    fn id(&self) -> &str {
        self.id
    }

    fn evaluate(&self, profile: &SystemProfile) -> Vec<Recommendation> {
        (self.check)(profile).into_iter().collect()
    }
}

/// Every rule dotwin ships with
pub fn builtin() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(SimpleRule::new("show-file-extensions", show_file_extensions)),
        Box::new(SimpleRule::new("show-hidden-files", show_hidden_files)),
        Box::new(SimpleRule::new("dark-mode", dark_mode)),
        Box::new(SimpleRule::new("reduce-telemetry", reduce_telemetry)),
        Box::new(SimpleRule::new("developer-mode", developer_mode)),
        Box::new(SimpleRule::new("low-memory-visual-effects", low_memory)),
        Box::new(SimpleRule::new("low-disk-storage-sense", low_disk)),
    ]
}

fn show_file_extensions(profile: &SystemProfile) -> Option<Recommendation> {
    if profile.settings.file_extensions_visible != Some(false) {
        return None;
    }
    let spec = registry_spec(
        "show-file-extensions",
        EXPLORER_ADVANCED,
        json!({ "HideFileExt": 0 }),
    );
    Some(
        Recommendation::new(
            "show-file-extensions",
            "Show file extensions",
            "explorer",
            Priority::High,
            spec,
        )
        .description("Explorer hides known file extensions, which makes renamed executables easy to miss.")
        .confidence(0.9)
        .effect("explorer.hideFileExt", 0),
    )
}

fn show_hidden_files(profile: &SystemProfile) -> Option<Recommendation> {
    if profile.settings.hidden_files_visible != Some(false) {
        return None;
    }
    let spec = registry_spec("show-hidden-files", EXPLORER_ADVANCED, json!({ "Hidden": 1 }));
    Some(
        Recommendation::new(
            "show-hidden-files",
            "Show hidden files",
            "explorer",
            Priority::Medium,
            spec,
        )
        .description("Hidden files and folders are not shown in Explorer.")
        .confidence(0.7)
        .effect("explorer.hidden", 1),
    )
}

fn dark_mode(profile: &SystemProfile) -> Option<Recommendation> {
    if profile.settings.dark_mode != Some(false) {
        return None;
    }
    let spec = registry_spec(
        "dark-mode",
        PERSONALIZE,
        json!({ "AppsUseLightTheme": 0, "SystemUsesLightTheme": 0 }),
    );
    Some(
        Recommendation::new("dark-mode", "Enable dark mode", "appearance", Priority::Low, spec)
            .description("Switch apps and the shell to the dark theme.")
            .confidence(0.5)
            .effect("theme.dark", true),
    )
}

fn reduce_telemetry(profile: &SystemProfile) -> Option<Recommendation> {
    let level = profile.settings.telemetry_level?;
    if level <= 1 {
        return None;
    }
    let spec = registry_spec("reduce-telemetry", DATA_COLLECTION, json!({ "AllowTelemetry": 1 }))
        .description("Limit diagnostic data to required only");
    Some(
        Recommendation::new(
            "reduce-telemetry",
            "Reduce diagnostic data",
            "privacy",
            Priority::High,
            spec,
        )
        .description(format!(
            "Diagnostic data level is {level}; only required data needs to be sent."
        ))
        .confidence(0.85)
        .prerequisite("administrator")
        .effect("telemetry.level", 1)
        .meta("currentLevel", level),
    )
}

fn developer_mode(profile: &SystemProfile) -> Option<Recommendation> {
    if profile.settings.developer_mode != Some(false) {
        return None;
    }
    let tools: Vec<&str> = DEV_TOOLS
        .iter()
        .copied()
        .filter(|tool| profile.software.has_package(tool))
        .collect();
    if tools.is_empty() {
        return None;
    }
    let spec = registry_spec(
        "developer-mode",
        APP_MODEL_UNLOCK,
        json!({ "AllowDevelopmentWithoutDevLicense": 1 }),
    );
    // More tools, more certainty this is a dev box
    let confidence = 0.5 + 0.1 * tools.len() as f64;
    Some(
        Recommendation::new(
            "developer-mode",
            "Enable developer mode",
            "development",
            Priority::Medium,
            spec,
        )
        .description(format!("Development tools are installed: {}.", tools.join(", ")))
        .confidence(confidence)
        .prerequisite("administrator")
        .effect("developer.mode", true)
        .meta("detectedTools", tools),
    )
}

fn low_memory(profile: &SystemProfile) -> Option<Recommendation> {
    let memory = profile.hardware.memory_gb;
    if memory <= 0.0 || memory >= LOW_MEMORY_GB {
        return None;
    }
    let spec = registry_spec(
        "visual-effects-performance",
        VISUAL_EFFECTS,
        json!({ "VisualFXSetting": 2 }),
    );
    Some(
        Recommendation::new(
            "visual-effects-performance",
            "Adjust visual effects for performance",
            "performance",
            Priority::Medium,
            spec,
        )
        .description(format!(
            "{memory:.1} GB of memory; animations and shadows cost more than they are worth."
        ))
        .confidence(if memory < 4.0 { 0.9 } else { 0.7 })
        .effect("visualEffects.mode", "performance")
        .meta("memoryGb", memory),
    )
}

fn low_disk(profile: &SystemProfile) -> Option<Recommendation> {
    let free = profile.hardware.disk_free_percent()?;
    if free >= LOW_DISK_PERCENT {
        return None;
    }
    let priority = if free < CRITICAL_DISK_PERCENT {
        Priority::Critical
    } else {
        Priority::High
    };
    let spec = registry_spec("storage-sense", STORAGE_SENSE, json!({ "01": 1, "2048": 7 }))
        .description("Turn on Storage Sense with a weekly cadence");
    Some(
        Recommendation::new(
            "storage-sense",
            "Enable Storage Sense",
            "storage",
            priority,
            spec,
        )
        .description(format!(
            "Only {free:.1}% of the system disk ({:.1} GB) is free.",
            profile.hardware.disk_free_gb
        ))
        .confidence(0.8)
        .effect("storage.sense", true)
        .meta("freePercent", (free * 10.0).round() / 10.0),
    )
}
