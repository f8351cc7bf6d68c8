use colored::Colorize;

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Format a count of gigabytes for display
pub fn format_gb(gb: f64) -> String {
    if gb >= 1024.0 {
        format!("{:.2} TB", gb / 1024.0)
    } else {
        format!("{gb:.1} GB")
    }
}

/// Yes/No/unknown for optional flags
pub fn yes_no(value: Option<bool>) -> String {
    match value {
        Some(true) => "yes".green().to_string(),
        Some(false) => "no".to_string(),
        None => "unknown".dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_gb() {
        assert_eq!(format_gb(15.94), "15.9 GB");
        assert_eq!(format_gb(2048.0), "2.00 TB");
    }

    #[test]
    fn test_yes_no_unknown() {
        colored::control::set_override(false);
        assert_eq!(yes_no(None), "unknown");
        assert_eq!(yes_no(Some(false)), "no");
    }
}
