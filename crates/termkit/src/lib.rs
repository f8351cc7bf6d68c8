//! # termkit
//!
//! Terminal toolkit for CLI applications that mix nested progress display
//! with log output.
//!
//! - **Progress**: a [`ProgressStack`] of nested [`ProgressNode`]s with
//!   parent/child completion semantics, rendered as indicatif bars
//! - **Logging**: a leveled, timestamped [`LogSink`] whose writes are
//!   coordinated with the progress display
//! - **Bridge**: routes the `log` facade through the same coordination
//! - **Formatting**: elapsed time and truncation helpers
//!
//! ## Quick Start
//!
//! ```no_run
//! use termkit::{Completion, LogLevel, LogSink, NewProgress, ProgressStack, StackOptions};
//!
//! let mut stack = ProgressStack::new(LogSink::new(LogLevel::Info), StackOptions::detect());
//!
//! let root = stack.start(NewProgress::new("Apply configuration").total(2));
//! let child = stack.start(NewProgress::new("Packages").parent(root));
//! stack.log("installing git", LogLevel::Info, Some(child));
//! stack.complete(child, Completion::new().status("1 installed"));
//! stack.complete(root, Completion::new());
//! ```
//!
//! ## Failure policy
//!
//! Progress bookkeeping never aborts the caller. Unknown ids, parents the
//! stack never issued and double completion are reported as warnings and counted in
//! [`StackStats::warnings`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod error;
pub mod format;
pub mod progress;
pub mod sink;

pub use error::ProgressError;
pub use format::{format_elapsed, truncate};
pub use progress::{
    Completion, FrameLine, Metrics, NewProgress, ProgressId, ProgressNode, ProgressStack,
    ProgressUpdate, RenderMode, StackOptions, StackStats,
};
pub use sink::{Captured, LogLevel, LogSink};
