//! Configuration documents
//!
//! A document lists the items to converge plus free-form settings and
//! metadata. JSON is the primary format; `.toml` files with the same shape
//! are accepted too. Only structure is validated here: an unknown item
//! `type` is reported when the item runs, not at load time.

use anyhow::{Context, Result, bail};
use declarative::ErrorPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick a format from the file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// A configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemSpec>,
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// One item entry as written in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl ItemSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            description: None,
            properties: Map::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// String property
    pub fn str_prop(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Boolean property
    pub fn bool_prop(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(Value::as_bool)
    }

    /// List-of-strings property. A single string is treated as a one-element list.
    pub fn str_list(&self, key: &str) -> Vec<String> {
        match self.properties.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

/// Typed view over the known `settings` keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub continue_on_error: bool,
    pub parallel_tests: bool,
    pub jobs: Option<usize>,
    pub log_file: Option<PathBuf>,
    pub plugins: Vec<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            parallel_tests: false,
            jobs: None,
            log_file: None,
            plugins: Vec::new(),
        }
    }
}

impl RunSettings {
    pub fn error_policy(&self) -> ErrorPolicy {
        if self.continue_on_error {
            ErrorPolicy::Continue
        } else {
            ErrorPolicy::FailFast
        }
    }
}

impl ConfigDocument {
    /// Load a document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content, ConfigFormat::from_path(path))
            .with_context(|| format!("Invalid configuration document {}", path.display()))
    }

    /// Parse a document from text
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let doc: Self = match format {
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };
        doc.validate()?;
        Ok(doc)
    }

    /// Structural checks only
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("document name is empty");
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                bail!("item #{} has an empty name", index + 1);
            }
            if item.kind.trim().is_empty() {
                bail!("item '{}' has an empty type", item.name);
            }
        }
        Ok(())
    }

    /// Read the known settings keys, ignoring the rest
    pub fn run_settings(&self) -> RunSettings {
        let defaults = RunSettings::default();
        let get_bool = |key: &str, default: bool| {
            self.settings
                .get(key)
                .and_then(Value::as_bool)
                .unwrap_or(default)
        };

        RunSettings {
            continue_on_error: get_bool("continueOnError", defaults.continue_on_error),
            parallel_tests: get_bool("parallelTests", defaults.parallel_tests),
            jobs: self
                .settings
                .get("jobs")
                .and_then(Value::as_u64)
                .filter(|j| *j > 0)
                .map(|j| j as usize),
            log_file: self
                .settings
                .get("logFile")
                .and_then(Value::as_str)
                .map(crate::paths::expand),
            plugins: self
                .settings
                .get("plugins")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "dev-workstation",
        "description": "Developer setup",
        "version": "1.0.0",
        "items": [
            {
                "name": "dev-tools",
                "type": "packages",
                "description": "Install developer tools",
                "properties": { "packages": ["Git.Git", "Microsoft.VisualStudioCode"] }
            },
            { "name": "mystery", "type": "quantum-flux" }
        ],
        "settings": { "continueOnError": false, "jobs": 8, "plugins": ["developer"] },
        "metadata": { "owner": "it" }
    }"#;

    #[test]
    fn test_parse_json_document() {
        let doc = ConfigDocument::parse(SAMPLE, ConfigFormat::Json).unwrap();
        assert_eq!(doc.name, "dev-workstation");
        assert_eq!(doc.items.len(), 2);
        assert_eq!(
            doc.items[0].str_list("packages"),
            vec!["Git.Git", "Microsoft.VisualStudioCode"]
        );
        // Unknown types are kept for the run to report
        assert_eq!(doc.items[1].kind, "quantum-flux");
    }

    #[test]
    fn test_run_settings() {
        let doc = ConfigDocument::parse(SAMPLE, ConfigFormat::Json).unwrap();
        let settings = doc.run_settings();
        assert!(!settings.continue_on_error);
        assert_eq!(settings.error_policy(), ErrorPolicy::FailFast);
        assert_eq!(settings.jobs, Some(8));
        assert_eq!(settings.plugins, vec!["developer"]);
        assert!(!settings.parallel_tests);
    }

    #[test]
    fn test_default_settings() {
        let doc = ConfigDocument::parse(r#"{"name": "empty"}"#, ConfigFormat::Json).unwrap();
        assert_eq!(doc.run_settings(), RunSettings::default());
        assert_eq!(doc.run_settings().error_policy(), ErrorPolicy::Continue);
    }

    #[test]
    fn test_parse_toml_document() {
        let toml = r#"
name = "minimal"

[[items]]
name = "dark-mode"
type = "registry"

[items.properties]
path = "HKCU:\\Software\\Microsoft\\Windows\\CurrentVersion\\Themes\\Personalize"
values = { AppsUseLightTheme = 0 }
"#;
        let doc = ConfigDocument::parse(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(doc.items[0].kind, "registry");
        assert!(doc.items[0].properties["values"].is_object());
    }

    #[test]
    fn test_rejects_structural_errors() {
        let missing_name = r#"{"name": "x", "items": [{"name": "", "type": "registry"}]}"#;
        assert!(ConfigDocument::parse(missing_name, ConfigFormat::Json).is_err());

        let not_json = "{ name: ";
        assert!(ConfigDocument::parse(not_json, ConfigFormat::Json).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigDocument::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("Could not read"));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("setup.TOML")),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("setup.json")),
            ConfigFormat::Json
        );
    }
}
