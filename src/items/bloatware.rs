//! Removal of preinstalled Appx packages

use super::describe;
use crate::config::ItemSpec;
use crate::runner::{self, ps_quote};
use anyhow::{Context, Result, bail};
use declarative::{ApplyContext, ApplyResult, ConfigurationItem, ItemState};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Appx packages that must not be installed
///
/// Patterns are case-insensitive globs (`Microsoft.Xbox*`), as
/// `Get-AppxPackage -Name` accepts.
#[derive(Debug, Clone)]
pub struct BloatwareItem {
    name: String,
    description: String,
    patterns: GlobSet,
    all_users: bool,
}

impl BloatwareItem {
    /// Properties: `packages` (list of name patterns), optional `allUsers`
    pub fn from_spec(spec: &ItemSpec) -> Result<Self> {
        let patterns = spec.str_list("packages");
        if patterns.is_empty() {
            bail!("'packages' must list at least one Appx package name");
        }
        let description = describe(spec, || format!("Remove {} Appx package(s)", patterns.len()));

        Ok(Self {
            name: spec.name.clone(),
            description,
            patterns: build_globset(&patterns)?,
            all_users: spec.bool_prop("allUsers").unwrap_or(false),
        })
    }

    fn scope_flag(&self) -> &'static str {
        if self.all_users { " -AllUsers" } else { "" }
    }

    /// Installed package names matching any pattern
    fn present(&self) -> Result<Vec<String>> {
        let script = format!(
            "Get-AppxPackage{} | Select-Object -ExpandProperty Name",
            self.scope_flag()
        );
        let out = runner::powershell(&script).context("Failed to list Appx packages")?;
        let installed: Vec<&str> = out.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        Ok(matching(&installed, &self.patterns))
    }
}

impl ConfigurationItem for BloatwareItem {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "bloatware"
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn requires_elevation(&self) -> bool {
        self.all_users
    }

    fn current_state(&self) -> Result<ItemState> {
        let present = self.present()?;
        if present.is_empty() {
            Ok(ItemState::Absent)
        } else {
            Ok(ItemState::Present {
                details: Some(present.join(", ")),
            })
        }
    }

    fn desired_state(&self) -> ItemState {
        ItemState::Absent
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let present = self.present()?;
        if present.is_empty() {
            return Ok(ApplyResult::NoChange);
        }
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: format!("Would remove {}", present.join(", ")),
            });
        }

        for package in &present {
            log::info!("Removing Appx package {}", package);
            let script = format!(
                "Get-AppxPackage{} -Name {} | Remove-AppxPackage{} -ErrorAction Stop",
                self.scope_flag(),
                ps_quote(package),
                self.scope_flag()
            );
            runner::powershell(&script).with_context(|| format!("Failed to remove {package}"))?;
        }
        Ok(ApplyResult::Removed)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid package pattern '{pattern}'"))?;
        builder.add(glob);
    }
    builder.build().context("Invalid package patterns")
}

/// Names from `installed` matching any of `patterns`, without duplicates
pub fn matching(installed: &[&str], patterns: &GlobSet) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for name in installed {
        if patterns.is_match(name) && !found.iter().any(|f| f.eq_ignore_ascii_case(name)) {
            found.push((*name).to_string());
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globs(patterns: &[&str]) -> GlobSet {
        let patterns: Vec<String> = patterns.iter().map(|p| (*p).to_string()).collect();
        build_globset(&patterns).unwrap()
    }

    #[test]
    fn test_patterns_match_case_insensitively() {
        let set = globs(&["Microsoft.BingNews"]);
        assert!(set.is_match("microsoft.bingnews"));
        assert!(!set.is_match("Microsoft.BingNewsExtra"));

        let set = globs(&["Microsoft.Xbox*", "*Solitaire*", "*.ZuneMusic"]);
        assert!(set.is_match("Microsoft.XboxGamingOverlay"));
        assert!(set.is_match("Microsoft.MicrosoftSolitaireCollection"));
        assert!(set.is_match("Microsoft.ZuneMusic"));
        assert!(!set.is_match("Microsoft.BingNews"));
    }

    #[test]
    fn test_matching_dedupes() {
        let installed = [
            "Microsoft.BingNews",
            "Microsoft.XboxApp",
            "Microsoft.WindowsCalculator",
        ];
        let set = globs(&["Microsoft.Bing*", "*News", "Microsoft.Xbox*"]);
        assert_eq!(
            matching(&installed, &set),
            vec!["Microsoft.BingNews", "Microsoft.XboxApp"]
        );
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let spec = ItemSpec::new("debloat", "bloatware")
            .property("packages", vec!["Microsoft.[Bing"]);
        let err = BloatwareItem::from_spec(&spec).unwrap_err();
        assert!(format!("{err:#}").contains("Microsoft.[Bing"));
    }

    #[test]
    fn test_all_users_requires_elevation() {
        let spec = ItemSpec::new("debloat", "bloatware")
            .property("packages", vec!["Microsoft.BingNews"])
            .property("allUsers", true);
        let item = BloatwareItem::from_spec(&spec).unwrap();
        assert!(item.requires_elevation());
        assert_eq!(item.desired_state(), ItemState::Absent);
    }
}
