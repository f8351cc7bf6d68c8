//! Registry values under one key, read and written with `reg.exe`

use super::describe;
use crate::config::ItemSpec;
use crate::runner;
use anyhow::{Context, Result, bail};
use declarative::{ApplyContext, ApplyResult, ConfigurationItem, ItemState};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A typed registry value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegValue {
    Dword(u32),
    Qword(u64),
    String(String),
    ExpandString(String),
}

impl RegValue {
    /// `reg.exe` type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Dword(_) => "REG_DWORD",
            Self::Qword(_) => "REG_QWORD",
            Self::String(_) => "REG_SZ",
            Self::ExpandString(_) => "REG_EXPAND_SZ",
        }
    }

    /// Data argument for `reg add /d`
    pub fn data(&self) -> String {
        match self {
            Self::Dword(v) => v.to_string(),
            Self::Qword(v) => v.to_string(),
            Self::String(s) | Self::ExpandString(s) => s.clone(),
        }
    }

    /// Build from a document value.
    ///
    /// Booleans and numbers become DWORDs (QWORDs above `u32::MAX`),
    /// strings become REG_SZ. An object `{ "type": "REG_EXPAND_SZ", "value": ... }`
    /// selects the type explicitly.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(Self::Dword(u32::from(*b))),
            Value::Number(n) => {
                let v = n
                    .as_u64()
                    .with_context(|| format!("registry numbers must be non-negative integers, got {n}"))?;
                Ok(u32::try_from(v).map_or(Self::Qword(v), Self::Dword))
            }
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Object(map) => {
                let kind = map
                    .get("type")
                    .and_then(Value::as_str)
                    .context("typed registry value needs a 'type'")?;
                let inner = map.get("value").context("typed registry value needs a 'value'")?;
                Self::typed(kind, inner)
            }
            other => bail!("unsupported registry value {other}"),
        }
    }

    fn typed(kind: &str, value: &Value) -> Result<Self> {
        let as_text = || match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match kind.to_ascii_uppercase().as_str() {
            "REG_DWORD" | "DWORD" => Ok(Self::Dword(
                value
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .or_else(|| value.as_bool().map(u32::from))
                    .context("REG_DWORD value must fit in 32 bits")?,
            )),
            "REG_QWORD" | "QWORD" => Ok(Self::Qword(
                value.as_u64().context("REG_QWORD value must be an integer")?,
            )),
            "REG_SZ" | "STRING" => Ok(Self::String(as_text())),
            "REG_EXPAND_SZ" | "EXPANDSTRING" => Ok(Self::ExpandString(as_text())),
            other => bail!("unsupported registry type '{other}'"),
        }
    }

    /// Parse the type and data columns of `reg query` output
    pub fn parse(type_name: &str, data: &str) -> Option<Self> {
        let data = data.trim();
        match type_name {
            "REG_DWORD" => parse_hex(data).and_then(|v| u32::try_from(v).ok()).map(Self::Dword),
            "REG_QWORD" => parse_hex(data).map(Self::Qword),
            "REG_SZ" => Some(Self::String(data.to_string())),
            "REG_EXPAND_SZ" => Some(Self::ExpandString(data.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RegValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dword(v) => write!(f, "{v}"),
            Self::Qword(v) => write!(f, "{v}"),
            Self::String(s) | Self::ExpandString(s) => write!(f, "\"{s}\""),
        }
    }
}

fn parse_hex(data: &str) -> Option<u64> {
    let digits = data.strip_prefix("0x").or_else(|| data.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

/// Normalise a key path to the form `reg.exe` accepts.
///
/// Accepts PowerShell drive syntax (`HKCU:\...`) and full hive names.
pub fn normalize_key(path: &str) -> Result<String> {
    let path = path.trim().replace('/', "\\");
    let (hive, rest) = path.split_once('\\').unwrap_or((path.as_str(), ""));
    let hive = match hive.trim_end_matches(':').to_ascii_uppercase().as_str() {
        "HKCU" | "HKEY_CURRENT_USER" => "HKCU",
        "HKLM" | "HKEY_LOCAL_MACHINE" => "HKLM",
        "HKCR" | "HKEY_CLASSES_ROOT" => "HKCR",
        "HKU" | "HKEY_USERS" => "HKU",
        other => bail!("unknown registry hive '{other}'"),
    };
    let rest = rest.trim_matches('\\');
    if rest.is_empty() {
        Ok(hive.to_string())
    } else {
        Ok(format!("{hive}\\{rest}"))
    }
}

/// Values found under a key in `reg query` output, by name
pub fn parse_query(output: &str) -> BTreeMap<String, RegValue> {
    let mut values = BTreeMap::new();
    for line in output.lines() {
        // Value lines are indented: "    Name    REG_TYPE    data"
        if !line.starts_with("    ") {
            continue;
        }
        let parts: Vec<&str> = line.trim().splitn(3, "    ").collect();
        if parts.len() < 2 {
            continue;
        }
        let data = parts.get(2).copied().unwrap_or("");
        if let Some(value) = RegValue::parse(parts[1].trim(), data) {
            values.insert(parts[0].trim().to_string(), value);
        }
    }
    values
}

/// Values under one registry key
#[derive(Debug, Clone)]
pub struct RegistryItem {
    name: String,
    description: String,
    key: String,
    values: BTreeMap<String, RegValue>,
}

impl RegistryItem {
    /// Properties: `path` (key), `values` (object of name → value)
    pub fn from_spec(spec: &ItemSpec) -> Result<Self> {
        let path = spec.str_prop("path").context("'path' is required")?;
        let key = normalize_key(path)?;

        let raw = spec
            .properties
            .get("values")
            .and_then(Value::as_object)
            .context("'values' must be an object of value names")?;
        if raw.is_empty() {
            bail!("'values' is empty");
        }
        let mut values = BTreeMap::new();
        for (name, value) in raw {
            let value =
                RegValue::from_json(value).with_context(|| format!("value '{name}'"))?;
            values.insert(name.clone(), value);
        }

        let description = describe(spec, || format!("Set {} value(s) under {}", values.len(), key));

        Ok(Self {
            name: spec.name.clone(),
            description,
            key,
            values,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn read(&self) -> Result<BTreeMap<String, RegValue>> {
        let out = runner::run_output("reg", &["query", &self.key])?;
        if !out.status.success() {
            // Key does not exist yet
            return Ok(BTreeMap::new());
        }
        Ok(parse_query(&String::from_utf8_lossy(&out.stdout)))
    }

    fn render(values: &BTreeMap<String, &RegValue>) -> String {
        values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Desired values that differ from `current`
    fn drift<'a>(&'a self, current: &BTreeMap<String, RegValue>) -> Vec<(&'a String, &'a RegValue)> {
        self.values
            .iter()
            .filter(|(name, want)| current.get(*name) != Some(*want))
            .collect()
    }
}

impl ConfigurationItem for RegistryItem {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "registry"
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn requires_elevation(&self) -> bool {
        !self.key.starts_with("HKCU")
    }

    fn current_state(&self) -> Result<ItemState> {
        let current = self.read()?;
        let drift = self.drift(&current);
        if drift.is_empty() {
            return Ok(self.desired_state());
        }

        let found: BTreeMap<String, &RegValue> = self
            .values
            .keys()
            .filter_map(|k| current.get(k).map(|v| (k.clone(), v)))
            .collect();
        if found.is_empty() {
            return Ok(ItemState::Absent);
        }

        let wanted: BTreeMap<String, &RegValue> =
            drift.iter().map(|(k, v)| ((*k).clone(), *v)).collect();
        Ok(ItemState::Modified {
            from: Self::render(&found),
            to: Self::render(&wanted),
        })
    }

    fn desired_state(&self) -> ItemState {
        let all: BTreeMap<String, &RegValue> =
            self.values.iter().map(|(k, v)| (k.clone(), v)).collect();
        ItemState::Present {
            details: Some(Self::render(&all)),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let current = self.read()?;
        let drift = self.drift(&current);
        if drift.is_empty() {
            return Ok(ApplyResult::NoChange);
        }
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: format!("Would set {} value(s)", drift.len()),
            });
        }

        let created = current.is_empty();
        for (name, value) in drift {
            log::debug!("reg add {} /v {} = {}", self.key, name, value);
            let data = value.data();
            runner::run_capture(
                "reg",
                &[
                    "add",
                    &self.key,
                    "/v",
                    name,
                    "/t",
                    value.type_name(),
                    "/d",
                    &data,
                    "/f",
                ],
            )
            .with_context(|| format!("Failed to set {}\\{}", self.key, name))?;
        }

        Ok(if created {
            ApplyResult::Created
        } else {
            ApplyResult::Modified
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const QUERY: &str = "\r
HKEY_CURRENT_USER\\Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\Advanced\r
    HideFileExt    REG_DWORD    0x1\r
    Hidden    REG_DWORD    0x2\r
    ShellPath    REG_EXPAND_SZ    %USERPROFILE%\\shell\r
    Greeting    REG_SZ    hello  world\r
    Blob    REG_BINARY    0100\r
";

    #[test]
    fn test_parse_query() {
        let values = parse_query(QUERY);
        assert_eq!(values["HideFileExt"], RegValue::Dword(1));
        assert_eq!(values["Hidden"], RegValue::Dword(2));
        assert_eq!(
            values["ShellPath"],
            RegValue::ExpandString("%USERPROFILE%\\shell".into())
        );
        assert_eq!(values["Greeting"], RegValue::String("hello  world".into()));
        // Unsupported types are ignored
        assert!(!values.contains_key("Blob"));
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(
            normalize_key("HKCU:\\Software\\Microsoft").unwrap(),
            "HKCU\\Software\\Microsoft"
        );
        assert_eq!(
            normalize_key("HKEY_LOCAL_MACHINE/SOFTWARE/Policies/").unwrap(),
            "HKLM\\SOFTWARE\\Policies"
        );
        assert!(normalize_key("HKXX:\\Nope").is_err());
    }

    #[test]
    fn test_value_from_json() {
        assert_eq!(RegValue::from_json(&json!(true)).unwrap(), RegValue::Dword(1));
        assert_eq!(RegValue::from_json(&json!(0)).unwrap(), RegValue::Dword(0));
        assert_eq!(
            RegValue::from_json(&json!(5_000_000_000u64)).unwrap(),
            RegValue::Qword(5_000_000_000)
        );
        assert_eq!(
            RegValue::from_json(&json!({"type": "REG_EXPAND_SZ", "value": "%TEMP%"})).unwrap(),
            RegValue::ExpandString("%TEMP%".into())
        );
        assert!(RegValue::from_json(&json!(-1)).is_err());
        assert!(RegValue::from_json(&json!([1])).is_err());
    }

    fn item(path: &str) -> RegistryItem {
        let spec = ItemSpec::new("show-extensions", "registry")
            .property("path", path)
            .property("values", json!({"HideFileExt": 0, "Hidden": 1}));
        RegistryItem::from_spec(&spec).unwrap()
    }

    #[test]
    fn test_drift() {
        let item = item("HKCU:\\Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\Advanced");
        let current = parse_query(QUERY);
        let drift = item.drift(&current);
        let names: Vec<_> = drift.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Hidden", "HideFileExt"]);

        let mut fixed = current;
        fixed.insert("HideFileExt".into(), RegValue::Dword(0));
        fixed.insert("Hidden".into(), RegValue::Dword(1));
        assert!(item.drift(&fixed).is_empty());
    }

    #[test]
    fn test_elevation_by_hive() {
        assert!(!item("HKCU:\\Software\\Test").requires_elevation());
        assert!(item("HKLM:\\SOFTWARE\\Policies\\Test").requires_elevation());
    }

    #[test]
    fn test_desired_state_lists_values() {
        let state = item("HKCU:\\Software\\Test").desired_state();
        assert_eq!(
            state,
            ItemState::Present {
                details: Some("Hidden=1, HideFileExt=0".into())
            }
        );
    }
}
