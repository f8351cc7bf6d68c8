//! A managed block inside the PowerShell profile script

use super::describe;
use crate::config::ItemSpec;
use crate::paths;
use anyhow::{Context, Result, bail};
use declarative::{ApplyContext, ApplyResult, ConfigurationItem, ItemState};
use std::fs;
use std::path::{Path, PathBuf};

/// PowerShell 7 profile for the current user and host
const DEFAULT_PROFILE: &str = "~/Documents/PowerShell/Microsoft.PowerShell_profile.ps1";

/// Lines owned by dotwin between a pair of marker comments.
///
/// Anything outside the markers belongs to the user and is never touched.
#[derive(Debug, Clone)]
pub struct PowerShellProfileItem {
    name: String,
    description: String,
    path: PathBuf,
    content: String,
}

impl PowerShellProfileItem {
    /// Properties: `content` (string) or `lines` (list), optional `path`
    pub fn from_spec(spec: &ItemSpec) -> Result<Self> {
        let content = match spec.str_prop("content") {
            Some(content) => content.to_string(),
            None => spec.str_list("lines").join("\n"),
        };
        let content = content.trim_end().to_string();
        if content.trim().is_empty() {
            bail!("'content' or 'lines' is required");
        }

        let path = paths::expand(spec.str_prop("path").unwrap_or(DEFAULT_PROFILE));
        let description = describe(spec, || format!("Manage a block in {}", path.display()));

        Ok(Self {
            name: spec.name.clone(),
            description,
            path,
            content,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn begin_marker(&self) -> String {
        format!("# >>> dotwin: {} >>>", self.name)
    }

    fn end_marker(&self) -> String {
        format!("# <<< dotwin: {} <<<", self.name)
    }

    fn block(&self) -> String {
        format!("{}\n{}\n{}", self.begin_marker(), self.content, self.end_marker())
    }

    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(|s| Some(s.replace("\r\n", "\n")))
            .with_context(|| format!("Could not read {}", self.path.display()))
    }
}

/// Managed block found in a script: (start byte, end byte, inner content)
fn find_block<'a>(script: &'a str, begin: &str, end: &str) -> Option<(usize, usize, &'a str)> {
    let start = script.find(begin)?;
    let inner_start = start + begin.len();
    let end_rel = script[inner_start..].find(end)?;
    let inner_end = inner_start + end_rel;
    let inner = script[inner_start..inner_end].trim_matches('\n');
    Some((start, inner_end + end.len(), inner))
}

impl ConfigurationItem for PowerShellProfileItem {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "powershell_profile"
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn current_state(&self) -> Result<ItemState> {
        let Some(script) = self.read()? else {
            return Ok(ItemState::Absent);
        };
        Ok(
            match find_block(&script, &self.begin_marker(), &self.end_marker()) {
                None => ItemState::Absent,
                Some((_, _, inner)) if inner == self.content => self.desired_state(),
                Some((_, _, inner)) => ItemState::Modified {
                    from: format!("{} line(s)", inner.lines().count()),
                    to: format!("{} line(s)", self.content.lines().count()),
                },
            },
        )
    }

    fn desired_state(&self) -> ItemState {
        ItemState::Present {
            details: Some(format!("{} line(s)", self.content.lines().count())),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let existing = self.read()?;
        let script = existing.clone().unwrap_or_default();
        let found = find_block(&script, &self.begin_marker(), &self.end_marker());

        if let Some((_, _, inner)) = found
            && inner == self.content
        {
            return Ok(ApplyResult::NoChange);
        }
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: format!("Would update {}", self.path.display()),
            });
        }

        let (updated, result) = match found {
            Some((start, end, _)) => (
                format!("{}{}{}", &script[..start], self.block(), &script[end..]),
                ApplyResult::Modified,
            ),
            None => {
                let mut updated = script.clone();
                if !updated.is_empty() && !updated.ends_with('\n') {
                    updated.push('\n');
                }
                if !updated.is_empty() {
                    updated.push('\n');
                }
                updated.push_str(&self.block());
                updated.push('\n');
                let result = if existing.is_some() {
                    ApplyResult::Modified
                } else {
                    ApplyResult::Created
                };
                (updated, result)
            }
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        fs::write(&self.path, updated)
            .with_context(|| format!("Could not write {}", self.path.display()))?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn item(dir: &TempDir, lines: &[&str]) -> PowerShellProfileItem {
        let spec = ItemSpec::new("prompt", "powershell_profile")
            .property(
                "path",
                dir.path()
                    .join("profile.ps1")
                    .to_string_lossy()
                    .to_string(),
            )
            .property("lines", lines.to_vec());
        PowerShellProfileItem::from_spec(&spec).unwrap()
    }

    #[test]
    fn test_creates_profile() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, &["Set-PSReadLineOption -EditMode Emacs"]);
        let mut ctx = ApplyContext::new(false, false, false);

        assert_eq!(item.current_state().unwrap(), ItemState::Absent);
        assert_eq!(item.apply(&mut ctx).unwrap(), ApplyResult::Created);
        assert!(item.test().unwrap());
        assert_eq!(item.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
    }

    #[test]
    fn test_preserves_user_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.ps1");
        fs::write(&path, "Import-Module posh-git").unwrap();

        let mut ctx = ApplyContext::new(false, false, false);
        let first = item(&dir, &["Set-Alias ll Get-ChildItem"]);
        assert_eq!(first.apply(&mut ctx).unwrap(), ApplyResult::Modified);

        let second = item(&dir, &["Set-Alias ll Get-ChildItem", "Set-Alias g git"]);
        assert!(matches!(
            second.current_state().unwrap(),
            ItemState::Modified { .. }
        ));
        assert_eq!(second.apply(&mut ctx).unwrap(), ApplyResult::Modified);

        let script = fs::read_to_string(&path).unwrap();
        assert!(script.starts_with("Import-Module posh-git\n"));
        assert_eq!(script.matches("# >>> dotwin: prompt >>>").count(), 1);
        assert!(script.contains("Set-Alias g git"));
        assert!(second.test().unwrap());
    }

    #[test]
    fn test_requires_content() {
        let spec = ItemSpec::new("empty", "powershell_profile");
        assert!(PowerShellProfileItem::from_spec(&spec).is_err());
    }
}
