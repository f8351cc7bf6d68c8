//! Host validation performed before any command does work
//!
//! dotwin only targets Windows 11 (build 22000 or newer) with Windows
//! PowerShell 5.1 or PowerShell 7 available. Anything else is fatal.

use crate::runner;
use std::fmt;
use thiserror::Error;

/// First Windows 11 build number
pub const MIN_WINDOWS_BUILD: u32 = 22000;

/// Oldest supported PowerShell
pub const MIN_POWERSHELL: Version = Version { major: 5, minor: 1 };

/// Environment variable that skips validation (for CI and development hosts)
pub const ENV_SKIP_CHECK: &str = "DOTWIN_SKIP_ENV_CHECK";

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("dotwin requires Windows, found {0}")]
    NotWindows(String),

    #[error("Windows 11 (build {min}+) is required, found build {0}", min = MIN_WINDOWS_BUILD)]
    UnsupportedBuild(u32),

    #[error("PowerShell {min} or newer is required, found {0}", min = MIN_POWERSHELL)]
    PowerShellTooOld(Version),

    #[error("could not determine {what}: {detail}")]
    Undetermined { what: &'static str, detail: String },
}

/// major.minor version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    /// Parse "5.1.22621.2506" style strings, ignoring trailing components
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = parts
            .next()
            .map_or(Some(0), |m| m.trim().parse().ok())?;
        Some(Self { major, minor })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What validation found
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub build: u32,
    pub powershell: Version,
}

/// Check the host, returning what was found or the first failing requirement
pub fn validate() -> Result<Option<HostInfo>, EnvironmentError> {
    if std::env::var_os(ENV_SKIP_CHECK).is_some() {
        log::debug!("Environment validation skipped by {}", ENV_SKIP_CHECK);
        return Ok(None);
    }

    if !cfg!(windows) {
        return Err(EnvironmentError::NotWindows(std::env::consts::OS.to_string()));
    }

    let build = windows_build()?;
    let powershell = powershell_version()?;
    let info = check(build, powershell)?;
    log::debug!("Host: build {}, PowerShell {}", info.build, info.powershell);
    Ok(Some(info))
}

/// Compare found versions against the minimums
pub fn check(build: u32, powershell: Version) -> Result<HostInfo, EnvironmentError> {
    if build < MIN_WINDOWS_BUILD {
        return Err(EnvironmentError::UnsupportedBuild(build));
    }
    if powershell < MIN_POWERSHELL {
        return Err(EnvironmentError::PowerShellTooOld(powershell));
    }
    Ok(HostInfo { build, powershell })
}

fn windows_build() -> Result<u32, EnvironmentError> {
    let out = runner::powershell("[System.Environment]::OSVersion.Version.Build").map_err(|e| {
        EnvironmentError::Undetermined {
            what: "the Windows build",
            detail: format!("{e:#}"),
        }
    })?;
    out.trim()
        .parse()
        .map_err(|_| EnvironmentError::Undetermined {
            what: "the Windows build",
            detail: format!("unexpected output '{}'", out.trim()),
        })
}

fn powershell_version() -> Result<Version, EnvironmentError> {
    let out = runner::powershell("$PSVersionTable.PSVersion.ToString()").map_err(|e| {
        EnvironmentError::Undetermined {
            what: "the PowerShell version",
            detail: format!("{e:#}"),
        }
    })?;
    Version::parse(&out).ok_or_else(|| EnvironmentError::Undetermined {
        what: "the PowerShell version",
        detail: format!("unexpected output '{}'", out.trim()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        assert_eq!(
            Version::parse("5.1.22621.2506"),
            Some(Version { major: 5, minor: 1 })
        );
        assert_eq!(Version::parse("7"), Some(Version { major: 7, minor: 0 }));
        assert_eq!(Version::parse("abc"), None);
    }

    #[test]
    fn test_check_rejects_windows_10() {
        let err = check(19045, Version { major: 5, minor: 1 }).unwrap_err();
        assert!(matches!(err, EnvironmentError::UnsupportedBuild(19045)));
        assert!(err.to_string().contains("22000"));
    }

    #[test]
    fn test_check_rejects_old_powershell() {
        let err = check(22631, Version { major: 5, minor: 0 }).unwrap_err();
        assert_eq!(
            err.to_string(),
            "PowerShell 5.1 or newer is required, found 5.0"
        );
    }

    #[test]
    fn test_check_accepts_windows_11() {
        let info = check(22631, Version { major: 7, minor: 4 }).unwrap();
        assert_eq!(info.build, 22631);
    }
}
