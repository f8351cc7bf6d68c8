//! Human-readable formatting helpers

/// Format an elapsed duration compactly ("850ms", "4.2s", "3m 07s")
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let millis = elapsed.num_milliseconds().max(0);
    if millis < 1_000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{:.1}s", millis as f64 / 1_000.0)
    } else {
        let secs = millis / 1_000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// Truncate text to `max_len` characters, keeping the start
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = text.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::milliseconds(0)), "0ms");
        assert_eq!(format_elapsed(Duration::milliseconds(850)), "850ms");
        assert_eq!(format_elapsed(Duration::milliseconds(4_200)), "4.2s");
        assert_eq!(format_elapsed(Duration::seconds(187)), "3m 07s");
        assert_eq!(format_elapsed(Duration::milliseconds(-5)), "0ms");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exact", 5), "exact");
        assert_eq!(truncate("Microsoft.VisualStudioCode", 12), "Microsoft...");
        assert_eq!(truncate("abc", 2), "...");
    }
}
