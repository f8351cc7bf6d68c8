//! Administrator detection
//!
//! Elevation is never requested. The process either already runs as an
//! administrator or it does not; items that need it fail individually.

use crate::runner;

/// Environment variable forcing the elevation check result ("1"/"0")
pub const ENV_ASSUME_ELEVATED: &str = "DOTWIN_ASSUME_ELEVATED";

/// Whether the current process has administrator rights
pub fn is_elevated() -> bool {
    if let Some(forced) = forced_from_env() {
        log::debug!("Elevation forced by {}: {}", ENV_ASSUME_ELEVATED, forced);
        return forced;
    }

    if !cfg!(windows) {
        return false;
    }

    // `net session` only succeeds in an elevated shell
    let elevated = runner::run_quiet("net", &["session"]);
    log::debug!("Elevation check: {}", elevated);
    elevated
}

fn forced_from_env() -> Option<bool> {
    std::env::var(ENV_ASSUME_ELEVATED)
        .ok()
        .and_then(|v| parse_flag(&v))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("no"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
