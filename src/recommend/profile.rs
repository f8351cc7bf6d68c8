//! System profile: what recommendations are computed from

use crate::{items, runner};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsInfo {
    pub name: String,
    pub version: String,
    pub build: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareInfo {
    pub cpu: String,
    pub logical_cores: u32,
    pub memory_gb: f64,
    pub disk_total_gb: f64,
    pub disk_free_gb: f64,
    /// System disk is solid state
    pub ssd: Option<bool>,
}

impl HardwareInfo {
    /// Free share of the system disk in percent, if the size is known
    pub fn disk_free_percent(&self) -> Option<f64> {
        (self.disk_total_gb > 0.0).then(|| self.disk_free_gb * 100.0 / self.disk_total_gb)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareInfo {
    /// Installed package ids (winget ids where known)
    #[serde(default)]
    pub packages: Vec<String>,
    pub winget: bool,
    pub choco: bool,
}

impl SoftwareInfo {
    pub fn has_package(&self, id: &str) -> bool {
        self.packages.iter().any(|p| p.eq_ignore_ascii_case(id))
    }
}

/// Explorer, theme and privacy settings. `None` means "could not read".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInfo {
    pub dark_mode: Option<bool>,
    pub file_extensions_visible: Option<bool>,
    pub hidden_files_visible: Option<bool>,
    /// AllowTelemetry policy: 0 security, 1 required, 2 enhanced, 3 optional
    pub telemetry_level: Option<u32>,
    pub developer_mode: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemProfile {
    pub os: OsInfo,
    pub hardware: HardwareInfo,
    pub software: SoftwareInfo,
    pub settings: SettingsInfo,
    pub collected_at: DateTime<Local>,
}

impl Default for SystemProfile {
    fn default() -> Self {
        Self {
            os: OsInfo::default(),
            hardware: HardwareInfo::default(),
            software: SoftwareInfo::default(),
            settings: SettingsInfo::default(),
            collected_at: Local::now(),
        }
    }
}

/// Emits one JSON object with every field the profile needs
const COLLECT_SCRIPT: &str = r#"
$ErrorActionPreference = 'SilentlyContinue'
function RegValue($path, $name) { (Get-ItemProperty -Path $path -Name $name).$name }
$os = Get-CimInstance Win32_OperatingSystem
$cpu = Get-CimInstance Win32_Processor | Select-Object -First 1
$disk = Get-CimInstance Win32_LogicalDisk -Filter "DeviceID='$env:SystemDrive'"
$media = (Get-PhysicalDisk | Select-Object -First 1).MediaType
$adv = 'HKCU:\Software\Microsoft\Windows\CurrentVersion\Explorer\Advanced'
[pscustomobject]@{
  osName = $os.Caption
  osVersion = $os.Version
  build = [int]$os.BuildNumber
  cpu = $cpu.Name
  cores = [int]$cpu.NumberOfLogicalProcessors
  memoryBytes = [double]$os.TotalVisibleMemorySize * 1024
  diskTotalBytes = [double]$disk.Size
  diskFreeBytes = [double]$disk.FreeSpace
  media = "$media"
  lightTheme = RegValue 'HKCU:\Software\Microsoft\Windows\CurrentVersion\Themes\Personalize' 'AppsUseLightTheme'
  hideFileExt = RegValue $adv 'HideFileExt'
  hidden = RegValue $adv 'Hidden'
  telemetry = RegValue 'HKLM:\SOFTWARE\Policies\Microsoft\Windows\DataCollection' 'AllowTelemetry'
  devMode = RegValue 'HKLM:\SOFTWARE\Microsoft\Windows\CurrentVersion\AppModelUnlock' 'AllowDevelopmentWithoutDevLicense'
} | ConvertTo-Json -Compress
"#;

/// Raw output of [`COLLECT_SCRIPT`]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawProfile {
    os_name: Option<String>,
    os_version: Option<String>,
    build: Option<u32>,
    cpu: Option<String>,
    cores: Option<u32>,
    memory_bytes: Option<f64>,
    disk_total_bytes: Option<f64>,
    disk_free_bytes: Option<f64>,
    media: Option<String>,
    light_theme: Option<u32>,
    hide_file_ext: Option<u32>,
    hidden: Option<u32>,
    telemetry: Option<u32>,
    dev_mode: Option<u32>,
}

const GB: f64 = 1024.0 * 1024.0 * 1024.0;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl RawProfile {
    pub(crate) fn into_profile(self, software: SoftwareInfo) -> SystemProfile {
        SystemProfile {
            os: OsInfo {
                name: self.os_name.unwrap_or_default().trim().to_string(),
                version: self.os_version.unwrap_or_default(),
                build: self.build.unwrap_or(0),
            },
            hardware: HardwareInfo {
                cpu: self.cpu.unwrap_or_default().trim().to_string(),
                logical_cores: self.cores.unwrap_or(0),
                memory_gb: round1(self.memory_bytes.unwrap_or(0.0) / GB),
                disk_total_gb: round1(self.disk_total_bytes.unwrap_or(0.0) / GB),
                disk_free_gb: round1(self.disk_free_bytes.unwrap_or(0.0) / GB),
                ssd: self.media.as_deref().and_then(|m| match m.trim() {
                    "SSD" => Some(true),
                    "HDD" => Some(false),
                    _ => None,
                }),
            },
            software,
            settings: SettingsInfo {
                dark_mode: self.light_theme.map(|v| v == 0),
                file_extensions_visible: self.hide_file_ext.map(|v| v == 0),
                hidden_files_visible: self.hidden.map(|v| v == 1),
                // Without the policy Windows sends optional data
                telemetry_level: Some(self.telemetry.unwrap_or(3)),
                developer_mode: Some(self.dev_mode == Some(1)),
            },
            collected_at: Local::now(),
        }
    }
}

impl SystemProfile {
    /// Query the running system
    pub fn collect() -> Result<Self> {
        let json = runner::powershell(COLLECT_SCRIPT).context("Failed to query system profile")?;
        let raw: RawProfile =
            serde_json::from_str(&json).context("Unexpected system profile output")?;
        Ok(raw.into_profile(collect_software()))
    }

    /// Load a profile saved with [`SystemProfile::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid system profile {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))
    }
}

fn collect_software() -> SoftwareInfo {
    let winget = runner::command_exists("winget");
    let choco = runner::command_exists("choco");

    let mut packages = Vec::new();
    if winget {
        let args = ["list", "--accept-source-agreements", "--disable-interactivity"];
        match runner::run_output("winget", &args) {
            Ok(out) => packages.extend(items::parse_winget_list(&String::from_utf8_lossy(
                &out.stdout,
            ))),
            Err(e) => log::warn!("Could not list winget packages: {:#}", e),
        }
    }
    if choco {
        match runner::run_capture("choco", &["list", "--limit-output"]) {
            Ok(out) => packages.extend(items::parse_choco_list(&out)),
            Err(e) => log::warn!("Could not list choco packages: {:#}", e),
        }
    }

    SoftwareInfo {
        packages,
        winget,
        choco,
    }
}
