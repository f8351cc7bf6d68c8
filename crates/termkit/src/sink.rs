//! Leveled, timestamped log output for the console and an optional file.
//!
//! A [`LogSink`] on its own writes directly. When owned by a
//! [`ProgressStack`](crate::ProgressStack) every write goes through the
//! stack so that live progress bars are cleared before the line is printed
//! and redrawn afterwards.

use chrono::Local;
use colored::{ColoredString, Colorize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Severity of a log message, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Something failed
    Error,
    /// Something needs attention
    Warning,
    /// A step finished
    Success,
    /// Regular progress information
    Info,
    /// Shown with `-v`
    Verbose,
    /// Shown with `-vv`
    Debug,
}

impl LogLevel {
    /// Label used in log files
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Success => "SUCCESS",
            Self::Info => "INFO",
            Self::Verbose => "VERBOSE",
            Self::Debug => "DEBUG",
        }
    }

    /// Colored console symbol
    pub fn symbol(&self) -> ColoredString {
        match self {
            Self::Error => "✗".red(),
            Self::Warning => "⚠".yellow(),
            Self::Success => "✓".green(),
            Self::Info => "ℹ".blue(),
            Self::Verbose => "·".dimmed(),
            Self::Debug => "·".magenta(),
        }
    }

    /// Most verbose level shown for a `-v` count
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Warning;
        }
        match verbose {
            0 => Self::Info,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }
}

/// Lines written to a capturing console, shared with the sink
#[derive(Debug, Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<String>>>);

impl Captured {
    /// Snapshot of all captured lines
    pub fn lines(&self) -> Vec<String> {
        match self.0.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether any captured line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    fn push(&self, line: String) {
        match self.0.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

#[derive(Debug, Clone)]
enum Console {
    /// Errors to stderr, everything else to stdout
    Standard,
    Silent,
    Capture(Captured),
}

#[derive(Debug)]
struct LogFile {
    path: PathBuf,
    broken: bool,
}

/// A single message ready to be written
#[derive(Debug, Clone)]
pub(crate) struct LogRecord<'a> {
    pub level: LogLevel,
    pub message: &'a str,
    pub depth: usize,
    pub activity: Option<&'a str>,
}

/// Console and file writer with level filtering
#[derive(Debug)]
pub struct LogSink {
    max_level: LogLevel,
    console: Console,
    file: Option<LogFile>,
    emitted: u64,
}

impl LogSink {
    /// Sink writing to stdout/stderr, showing levels up to `max_level`
    pub fn new(max_level: LogLevel) -> Self {
        Self {
            max_level,
            console: Console::Standard,
            file: None,
            emitted: 0,
        }
    }

    /// Sink that writes nothing to the console
    pub fn silent(max_level: LogLevel) -> Self {
        Self {
            console: Console::Silent,
            ..Self::new(max_level)
        }
    }

    /// Sink that records console lines in memory (uncolored)
    pub fn capture(max_level: LogLevel) -> (Self, Captured) {
        let captured = Captured::default();
        let sink = Self {
            console: Console::Capture(captured.clone()),
            ..Self::new(max_level)
        };
        (sink, captured)
    }

    /// Also append every emitted line to `path`
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.set_file(path);
        self
    }

    /// Append emitted lines to `path` from now on, replacing any earlier file
    pub fn set_file(&mut self, path: impl AsRef<Path>) {
        self.file = Some(LogFile {
            path: path.as_ref().to_path_buf(),
            broken: false,
        });
    }

    /// Log file, if one is configured
    pub fn file(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path.as_path())
    }

    /// Least severe level that is still emitted
    pub fn max_level(&self) -> LogLevel {
        self.max_level
    }

    /// Change the level filter
    pub fn set_max_level(&mut self, level: LogLevel) {
        self.max_level = level;
    }

    /// Whether a message at `level` passes the filter
    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.max_level
    }

    /// Number of lines emitted so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Write a message directly, without any progress coordination.
    ///
    /// Empty or whitespace-only messages are dropped.
    pub fn log(&mut self, message: &str, level: LogLevel) {
        if message.trim().is_empty() || !self.enabled(level) {
            return;
        }
        self.emit(&LogRecord {
            level,
            message,
            depth: 0,
            activity: None,
        });
    }

    /// Write a record that already passed filtering
    pub(crate) fn emit(&mut self, record: &LogRecord<'_>) {
        self.emitted += 1;
        self.write_file(record);

        match &self.console {
            Console::Silent => {}
            Console::Capture(captured) => captured.push(plain_line(record)),
            Console::Standard => {
                let line = console_line(record);
                if record.level == LogLevel::Error {
                    eprintln!("{line}");
                } else {
                    println!("{line}");
                }
            }
        }
    }

    fn write_file(&mut self, record: &LogRecord<'_>) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if file.broken {
            return;
        }

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file.path)
            .and_then(|mut f| writeln!(f, "{}", file_line(record)));

        if let Err(e) = result {
            // Fall back to console-only output for the rest of the run
            file.broken = true;
            let path = file.path.display().to_string();
            let warning = format!("Could not write log file {path}: {e}");
            self.emit(&LogRecord {
                level: LogLevel::Warning,
                message: &warning,
                depth: 0,
                activity: None,
            });
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn console_line(record: &LogRecord<'_>) -> String {
    let message = match record.level {
        LogLevel::Verbose | LogLevel::Debug => record.message.dimmed().to_string(),
        _ => record.message.to_string(),
    };
    format!(
        "{} {}{} {}",
        Local::now().format("%H:%M:%S").to_string().dimmed(),
        indent(record.depth),
        record.level.symbol(),
        message
    )
}

fn plain_line(record: &LogRecord<'_>) -> String {
    format!(
        "{}[{}] {}",
        indent(record.depth),
        record.level.label(),
        record.message
    )
}

fn file_line(record: &LogRecord<'_>) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    match record.activity {
        Some(activity) => format!(
            "[{timestamp}] [{}] [{activity}] {}",
            record.level.label(),
            record.message
        ),
        None => format!("[{timestamp}] [{}] {}", record.level.label(), record.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering_filters_verbose() {
        let sink = LogSink::silent(LogLevel::Info);
        assert!(sink.enabled(LogLevel::Error));
        assert!(sink.enabled(LogLevel::Success));
        assert!(sink.enabled(LogLevel::Info));
        assert!(!sink.enabled(LogLevel::Verbose));
        assert!(!sink.enabled(LogLevel::Debug));
    }

    #[test]
    fn test_from_verbosity() {
        assert_eq!(LogLevel::from_verbosity(0, false), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(1, false), LogLevel::Verbose);
        assert_eq!(LogLevel::from_verbosity(5, false), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(3, true), LogLevel::Warning);
    }

    #[test]
    fn test_empty_message_is_dropped() {
        let (mut sink, captured) = LogSink::capture(LogLevel::Debug);
        sink.log("", LogLevel::Info);
        sink.log("   \t", LogLevel::Error);

        assert!(captured.lines().is_empty());
        assert_eq!(sink.emitted(), 0);
    }

    #[test]
    fn test_filtered_message_is_dropped() {
        let (mut sink, captured) = LogSink::capture(LogLevel::Info);
        sink.log("noisy detail", LogLevel::Verbose);

        assert!(captured.lines().is_empty());
        assert_eq!(sink.emitted(), 0);
    }

    #[test]
    fn test_capture_records_level_label() {
        let (mut sink, captured) = LogSink::capture(LogLevel::Info);
        sink.log("installed git", LogLevel::Success);

        assert_eq!(captured.lines(), vec!["[SUCCESS] installed git".to_string()]);
        assert_eq!(sink.emitted(), 1);
    }

    #[test]
    fn test_file_output_is_timestamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dotwin.log");

        let mut sink = LogSink::silent(LogLevel::Info).with_file(&path);
        sink.log("first", LogLevel::Info);
        sink.log("second", LogLevel::Warning);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("[INFO] first"));
        assert!(lines[1].ends_with("[WARNING] second"));
    }

    #[test]
    fn test_unwritable_file_falls_back_to_console() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending
        let (sink, captured) = LogSink::capture(LogLevel::Info);
        let mut sink = sink.with_file(dir.path());

        sink.log("still shown", LogLevel::Info);
        sink.log("again", LogLevel::Info);

        let lines = captured.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Could not write log file"));
        assert!(lines[1].contains("still shown"));
        assert!(lines[2].contains("again"));
    }

    #[test]
    fn test_file_line_includes_activity() {
        let record = LogRecord {
            level: LogLevel::Info,
            message: "msg",
            depth: 2,
            activity: Some("Installing packages"),
        };
        assert!(file_line(&record).ends_with("[INFO] [Installing packages] msg"));
        assert_eq!(plain_line(&record), "    [INFO] msg");
    }
}
