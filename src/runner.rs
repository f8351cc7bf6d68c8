use anyhow::{Context, Result};
use std::process::{Command, Output, Stdio};

/// PowerShell executable, Windows PowerShell 5.1 ships as `powershell`
pub const POWERSHELL: &str = "powershell";

/// Run a command and capture output
pub fn run_capture(cmd: &str, args: &[&str]) -> Result<String> {
    let output = run_output(cmd, args)?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        anyhow::bail!("{} failed: {}", cmd, detail)
    }
}

/// Run a command and return the raw output, whatever the exit status
pub fn run_output(cmd: &str, args: &[&str]) -> Result<Output> {
    Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))
}

/// Run a command silently, returning success/failure
pub fn run_quiet(cmd: &str, args: &[&str]) -> bool {
    Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run a PowerShell script block and capture its output
pub fn powershell(script: &str) -> Result<String> {
    run_capture(
        POWERSHELL,
        &["-NoProfile", "-NonInteractive", "-Command", script],
    )
}

/// Check if a command exists on PATH
pub fn command_exists(cmd: &str) -> bool {
    let locator = if cfg!(windows) { "where" } else { "which" };
    run_quiet(locator, &[cmd])
}

/// Quote a value as a single-quoted PowerShell string literal
pub fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ps_quote() {
        assert_eq!(ps_quote("Microsoft.BingNews"), "'Microsoft.BingNews'");
        assert_eq!(ps_quote("it's"), "'it''s'");
    }

    #[test]
    fn test_missing_command() {
        assert!(!command_exists("dotwin-definitely-not-a-command"));
        assert!(run_capture("dotwin-definitely-not-a-command", &[]).is_err());
    }
}
