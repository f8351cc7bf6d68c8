//! Path resolution for dotwin
//!
//! # Environment Variables
//!
//! - `DOTWIN_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/dotwin`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `DOTWIN_CONFIG_DIR` environment variable
//! 2. Platform config dir: `%APPDATA%\dotwin` on Windows, `~/.config/dotwin` elsewhere
//!
//! Paths written in documents may use `~`, `$VAR`, `${VAR}` or the Windows
//! `%VAR%` form; all are expanded by [`expand`].

use anyhow::{Context, Result};
use regex::Regex;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "DOTWIN_CONFIG_DIR";

/// Windows-style `%VAR%` reference
static PERCENT_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([A-Za-z_][A-Za-z0-9_]*)%").expect("invalid regex"));

/// Get the dotwin config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Some(config) = dirs::config_dir() {
        let path = config.join("dotwin");
        log::debug!("Using platform config dir: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("dotwin");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Resolve a configuration argument.
///
/// Existing paths are used as given. A bare name without an extension is
/// looked up in the config dir as `<name>.json` then `<name>.toml`.
pub fn resolve_config(arg: &str) -> Result<PathBuf> {
    let direct = expand(arg);
    if direct.exists() || direct.extension().is_some() {
        return Ok(direct);
    }

    let dir = config_dir()?;
    for ext in ["json", "toml"] {
        let candidate = dir.join(format!("{arg}.{ext}"));
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Ok(direct)
}

/// Expand `~`, `$VAR`/`${VAR}` and `%VAR%` in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let normalized = normalize_percent_vars(path);
    let expanded = shellexpand::full(&normalized).unwrap_or(Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Rewrite `%VAR%` as `${VAR}` so shellexpand can handle it
fn normalize_percent_vars(path: &str) -> Cow<'_, str> {
    PERCENT_VAR.replace_all(path, "$${$1}")
}
