//! Windows Terminal settings, merged into `settings.json`

use super::describe;
use crate::config::ItemSpec;
use crate::paths;
use anyhow::{Context, Result, bail};
use declarative::{ApplyContext, ApplyResult, ConfigurationItem, ItemState};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file of the Store build of Windows Terminal
const DEFAULT_SETTINGS: &str =
    "%LOCALAPPDATA%/Packages/Microsoft.WindowsTerminal_8wekyb3d8bbwe/LocalState/settings.json";

/// A partial settings document that must be contained in `settings.json`
///
/// Objects are merged key by key; arrays and scalars replace what is there.
/// Keys the document does not mention are left alone.
#[derive(Debug, Clone)]
pub struct TerminalItem {
    name: String,
    description: String,
    path: PathBuf,
    settings: Map<String, Value>,
}

impl TerminalItem {
    /// Properties: `settings` (object), optional `settingsPath`
    pub fn from_spec(spec: &ItemSpec) -> Result<Self> {
        let settings = spec
            .properties
            .get("settings")
            .and_then(Value::as_object)
            .cloned()
            .context("'settings' must be an object")?;
        if settings.is_empty() {
            bail!("'settings' is empty");
        }

        let path = paths::expand(spec.str_prop("settingsPath").unwrap_or(DEFAULT_SETTINGS));
        let description = describe(spec, || {
            let keys: Vec<&str> = settings.keys().map(String::as_str).collect();
            format!("Windows Terminal settings: {}", keys.join(", "))
        });

        Ok(Self {
            name: spec.name.clone(),
            description,
            path,
            settings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current document, or None if the file does not exist
    fn read(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Could not read {}", self.path.display()))?;
        let value = serde_json::from_str(&strip_line_comments(&content))
            .with_context(|| format!("Invalid JSON in {}", self.path.display()))?;
        Ok(Some(value))
    }
}

impl ConfigurationItem for TerminalItem {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "terminal"
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn current_state(&self) -> Result<ItemState> {
        let desired = Value::Object(self.settings.clone());
        Ok(match self.read()? {
            None => ItemState::Absent,
            Some(current) if contains(&current, &desired) => self.desired_state(),
            Some(_) => ItemState::Modified {
                from: self.path.display().to_string(),
                to: self.description.clone(),
            },
        })
    }

    fn desired_state(&self) -> ItemState {
        ItemState::Present {
            details: Some(self.path.display().to_string()),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let desired = Value::Object(self.settings.clone());
        let existing = self.read()?;
        if let Some(current) = &existing
            && contains(current, &desired)
        {
            return Ok(ApplyResult::NoChange);
        }
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: format!("Would update {}", self.path.display()),
            });
        }

        let created = existing.is_none();
        let mut document = existing.unwrap_or_else(|| Value::Object(Map::new()));
        merge(&mut document, &desired);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        if !created {
            let backup = self.path.with_extension("json.bak");
            fs::copy(&self.path, &backup)
                .with_context(|| format!("Could not back up to {}", backup.display()))?;
        }
        let content = serde_json::to_string_pretty(&document)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Could not write {}", self.path.display()))?;

        Ok(if created {
            ApplyResult::Created
        } else {
            ApplyResult::Modified
        })
    }
}

/// Whether every key in `desired` is present in `current` with the same value
pub fn contains(current: &Value, desired: &Value) -> bool {
    match (current, desired) {
        (Value::Object(cur), Value::Object(want)) => want
            .iter()
            .all(|(k, v)| cur.get(k).is_some_and(|c| contains(c, v))),
        (cur, want) => cur == want,
    }
}

/// Merge `overlay` into `base`, recursing into objects
pub fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Drop `//` line comments, which Windows Terminal tolerates in its settings
pub fn strip_line_comments(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn item(dir: &TempDir) -> TerminalItem {
        let spec = ItemSpec::new("terminal-defaults", "terminal")
            .property(
                "settingsPath",
                dir.path().join("settings.json").to_string_lossy().to_string(),
            )
            .property(
                "settings",
                json!({
                    "copyOnSelect": true,
                    "profiles": { "defaults": { "font": { "face": "Cascadia Code" } } }
                }),
            );
        TerminalItem::from_spec(&spec).unwrap()
    }

    #[test]
    fn test_contains_and_merge() {
        let mut base = json!({"a": 1, "nested": {"keep": true, "change": 1}, "list": [1, 2]});
        let overlay = json!({"nested": {"change": 2}, "list": [3]});
        assert!(!contains(&base, &overlay));

        merge(&mut base, &overlay);
        assert!(contains(&base, &overlay));
        assert_eq!(base["nested"]["keep"], json!(true));
        assert_eq!(base["list"], json!([3]));
        assert_eq!(base["a"], json!(1));
    }

    #[test]
    fn test_apply_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir);
        assert_eq!(item.current_state().unwrap(), ItemState::Absent);

        let mut ctx = ApplyContext::new(false, false, false);
        assert_eq!(item.apply(&mut ctx).unwrap(), ApplyResult::Created);
        assert!(item.test().unwrap());
        assert_eq!(item.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
    }

    #[test]
    fn test_apply_merges_and_backs_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            "// This file was initially generated by Windows Terminal\n{\n\"theme\": \"dark\",\n\"copyOnSelect\": false\n}\n",
        )
        .unwrap();

        let item = item(&dir);
        assert!(!item.test().unwrap());

        let mut ctx = ApplyContext::new(false, false, false);
        assert_eq!(item.apply(&mut ctx).unwrap(), ApplyResult::Modified);

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["theme"], json!("dark"));
        assert_eq!(written["copyOnSelect"], json!(true));
        assert_eq!(
            written["profiles"]["defaults"]["font"]["face"],
            json!("Cascadia Code")
        );
        assert!(dir.path().join("settings.json.bak").exists());
    }

    #[test]
    fn test_dry_run_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir);
        let mut ctx = ApplyContext::new(true, false, false);
        assert!(matches!(
            item.apply(&mut ctx).unwrap(),
            ApplyResult::Skipped { .. }
        ));
        assert!(!item.path().exists());
    }
}
