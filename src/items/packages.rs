//! Package installation through winget or Chocolatey

use super::describe;
use crate::config::ItemSpec;
use crate::runner;
use anyhow::{Context, Result, bail};
use declarative::{ApplyContext, ApplyResult, ConfigurationItem, ItemState};

/// Package manager used by an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Winget,
    Choco,
}

impl PackageManager {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "winget" => Some(Self::Winget),
            "choco" | "chocolatey" => Some(Self::Choco),
            _ => None,
        }
    }

    pub fn command(&self) -> &'static str {
        match self {
            Self::Winget => "winget",
            Self::Choco => "choco",
        }
    }

    /// Ids of installed packages
    fn installed(&self) -> Result<Vec<String>> {
        match self {
            Self::Winget => {
                let out = runner::run_output(
                    "winget",
                    &[
                        "list",
                        "--accept-source-agreements",
                        "--disable-interactivity",
                    ],
                )?;
                if !out.status.success() {
                    bail!("winget list failed with {}", out.status);
                }
                Ok(parse_winget_list(&String::from_utf8_lossy(&out.stdout)))
            }
            Self::Choco => {
                let out = runner::run_capture("choco", &["list", "--limit-output"])?;
                Ok(parse_choco_list(&out))
            }
        }
    }

    fn install(&self, id: &str) -> Result<()> {
        let args: Vec<&str> = match self {
            Self::Winget => vec![
                "install",
                "--id",
                id,
                "--exact",
                "--silent",
                "--accept-package-agreements",
                "--accept-source-agreements",
                "--disable-interactivity",
            ],
            Self::Choco => vec!["install", id, "-y", "--no-progress"],
        };
        runner::run_capture(self.command(), &args)
            .with_context(|| format!("Failed to install {id}"))?;
        Ok(())
    }
}

/// A set of packages that must be installed
#[derive(Debug, Clone)]
pub struct PackagesItem {
    name: String,
    description: String,
    manager: PackageManager,
    packages: Vec<String>,
}

impl PackagesItem {
    /// Properties: `packages` (list of ids), optional `manager` ("winget" | "choco")
    pub fn from_spec(spec: &ItemSpec) -> Result<Self> {
        let packages = spec.str_list("packages");
        if packages.is_empty() {
            bail!("'packages' must list at least one package id");
        }

        let manager = match spec.str_prop("manager") {
            None => PackageManager::Winget,
            Some(m) => PackageManager::parse(m)
                .with_context(|| format!("unknown package manager '{m}'"))?,
        };

        let description = describe(spec, || {
            format!("Install {} package(s) with {}", packages.len(), manager.command())
        });

        Ok(Self {
            name: spec.name.clone(),
            description,
            manager,
            packages,
        })
    }

    fn missing(&self) -> Result<Vec<String>> {
        if !runner::command_exists(self.manager.command()) {
            bail!("{} is not installed", self.manager.command());
        }
        let installed = self.manager.installed()?;
        Ok(missing_from(&installed, &self.packages))
    }
}

impl ConfigurationItem for PackagesItem {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "packages"
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    // Chocolatey installs machine-wide
    fn requires_elevation(&self) -> bool {
        self.manager == PackageManager::Choco
    }

    fn current_state(&self) -> Result<ItemState> {
        let missing = self.missing()?;
        Ok(state_for(&self.packages, &missing))
    }

    fn desired_state(&self) -> ItemState {
        state_for(&self.packages, &[])
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let missing = self.missing()?;
        if missing.is_empty() {
            return Ok(ApplyResult::NoChange);
        }
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: format!("Would install {}", missing.join(", ")),
            });
        }

        let mut failures = Vec::new();
        for id in &missing {
            log::info!("Installing {} with {}", id, self.manager.command());
            if let Err(e) = self.manager.install(id) {
                failures.push(format!("{e:#}"));
            }
        }

        if failures.is_empty() {
            Ok(ApplyResult::Created)
        } else {
            bail!("{}", failures.join("; "))
        }
    }
}

fn state_for(packages: &[String], missing: &[String]) -> ItemState {
    if missing.is_empty() {
        ItemState::Present {
            details: Some(format!("{} installed", packages.len())),
        }
    } else if missing.len() == packages.len() {
        ItemState::Absent
    } else {
        ItemState::Modified {
            from: format!("missing {}", missing.join(", ")),
            to: format!("{} installed", packages.len()),
        }
    }
}

/// Wanted ids not present in `installed`, compared case-insensitively
pub fn missing_from(installed: &[String], wanted: &[String]) -> Vec<String> {
    wanted
        .iter()
        .filter(|w| !installed.iter().any(|i| i.eq_ignore_ascii_case(w)))
        .cloned()
        .collect()
}

/// Extract the Id column from `winget list` table output.
///
/// The header row gives the column offsets; rows are sliced at those
/// character positions since names may contain spaces.
pub fn parse_winget_list(output: &str) -> Vec<String> {
    let mut lines = output.lines().map(|l| l.trim_end_matches('\r'));
    let Some(header) = lines.by_ref().find(|l| l.contains("Id") && l.contains("Name")) else {
        return Vec::new();
    };

    let header: Vec<char> = header.chars().collect();
    let Some(id_start) = column_start(&header, "Id") else {
        return Vec::new();
    };
    let id_end = column_start(&header, "Version").filter(|end| *end > id_start);

    lines
        .filter(|l| !l.trim_start().starts_with('-') && !l.trim().is_empty())
        .filter_map(|line| {
            let chars: Vec<char> = line.chars().collect();
            if chars.len() <= id_start {
                return None;
            }
            let end = id_end.unwrap_or(chars.len()).min(chars.len());
            let cell: String = chars[id_start..end].iter().collect();
            cell.split_whitespace().next().map(str::to_string)
        })
        .collect()
}

fn column_start(header: &[char], title: &str) -> Option<usize> {
    let title: Vec<char> = title.chars().collect();
    header.windows(title.len()).position(|w| w == title.as_slice())
}

/// Parse `choco list --limit-output` lines (`name|version`)
pub fn parse_choco_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|l| l.split_once('|'))
        .map(|(name, _)| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
