//! Diff, result and summary display

use colored::Colorize;
use declarative::{
    DiffSummary, ExecuteSummary, ItemDiff, ItemState, TestOutcome, TestStatus, TestSummary,
    group_by_kind,
};

/// Heading for an item kind
fn kind_title(kind: &str) -> &str {
    match kind {
        "packages" => "Packages (winget/choco)",
        "bloatware" => "Bloatware (Appx)",
        "registry" => "Registry",
        "terminal" => "Windows Terminal",
        "powershell_profile" => "PowerShell profile",
        "unsupported" => "Unsupported",
        other => other,
    }
}

/// Display a list of diffs grouped by kind
pub fn display_diff(diffs: &[ItemDiff], elevated: bool) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    );
    println!("│");

    for (kind, kind_diffs) in group_by_kind(diffs) {
        println!("│ {}", kind_title(&kind).bold());

        for diff in kind_diffs {
            let symbol = match (&diff.current, &diff.desired) {
                (ItemState::Absent, ItemState::Present { .. }) => "+".green(),
                (ItemState::Present { .. }, ItemState::Absent) => "-".red(),
                (ItemState::Modified { .. }, _) => "~".yellow(),
                _ => "?".dimmed(),
            };

            let admin = if diff.requires_elevation && !elevated {
                " [admin]".red().to_string()
            } else if diff.requires_elevation {
                " [admin]".dimmed().to_string()
            } else {
                String::new()
            };

            println!(
                "│   {} {:<30} {}{}",
                symbol,
                diff.name,
                state_text(&diff.current, &diff.desired).dimmed(),
                admin
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} add, {} remove, {} modify, {} need admin)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.removals.to_string().red(),
        summary.modifications.to_string().yellow(),
        summary.elevation_required
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// One-line description of a state transition
pub fn state_text(current: &ItemState, desired: &ItemState) -> String {
    match (current, desired) {
        (ItemState::Absent, ItemState::Present { details }) => format!(
            "(missing){}",
            details
                .as_ref()
                .map(|d| format!(" → {d}"))
                .unwrap_or_default()
        ),
        (ItemState::Present { details }, ItemState::Absent) => format!(
            "(will remove){}",
            details
                .as_ref()
                .map(|d| format!(" {d}"))
                .unwrap_or_default()
        ),
        (ItemState::Modified { from, to }, _) => format!("{from} → {to}"),
        (ItemState::Present { details: from }, ItemState::Present { details: to }) => format!(
            "{} → {}",
            from.as_deref().unwrap_or("current"),
            to.as_deref().unwrap_or("desired")
        ),
        _ => String::new(),
    }
}

/// Print each test outcome on its own line
pub fn display_test_results(outcomes: &[TestOutcome]) {
    println!();
    for outcome in outcomes {
        let (symbol, detail) = match &outcome.status {
            TestStatus::Compliant => ("✓".green(), String::new()),
            TestStatus::NonCompliant => ("⚠".yellow(), "not compliant".yellow().to_string()),
            TestStatus::Failed { error } => ("✗".red(), error.red().to_string()),
        };
        println!(
            "  {} {:<30} {:<20} {}",
            symbol,
            outcome.name,
            outcome.kind.dimmed(),
            detail
        );
    }
}

/// Print final test summary
pub fn print_test_summary(summary: &TestSummary) {
    println!();
    if summary.is_compliant() {
        println!(
            "  {} All {} item(s) compliant",
            "✓".green().bold(),
            summary.total()
        );
        return;
    }

    println!(
        "  {} {} of {} item(s) compliant",
        "⚠".yellow().bold(),
        summary.compliant,
        summary.total()
    );
    if summary.non_compliant > 0 {
        println!("    • {} not compliant", summary.non_compliant);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}

/// Print final apply summary
pub fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if summary.is_success() {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    }

    if summary.created > 0 {
        println!("    • {} items created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} items modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} items removed", summary.removed);
    }
    if summary.no_change > 0 {
        println!("    • {} items already compliant", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} items skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "items".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_text() {
        let present = |d: &str| ItemState::Present {
            details: Some(d.to_string()),
        };
        assert_eq!(
            state_text(&ItemState::Absent, &present("3 installed")),
            "(missing) → 3 installed"
        );
        assert_eq!(
            state_text(
                &ItemState::Modified {
                    from: "HideFileExt=1".into(),
                    to: "HideFileExt=0".into()
                },
                &present("HideFileExt=0")
            ),
            "HideFileExt=1 → HideFileExt=0"
        );
        assert_eq!(
            state_text(&present("Microsoft.BingNews"), &ItemState::Absent),
            "(will remove) Microsoft.BingNews"
        );
    }

    #[test]
    fn test_kind_title_falls_back() {
        assert_eq!(kind_title("registry"), "Registry");
        assert_eq!(kind_title("custom"), "custom");
    }
}
