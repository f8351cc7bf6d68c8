//! Bookkeeping errors raised by the progress stack.
//!
//! None of these abort the caller. The stack reports them as warnings
//! through its [`LogSink`](crate::LogSink), leaves node state untouched and
//! counts them in [`StackStats::warnings`](crate::StackStats).

use crate::progress::ProgressId;
use thiserror::Error;

/// Inconsistent progress bookkeeping detected by the stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    /// The id was never issued by this stack
    #[error("unknown progress id {0}, ignoring")]
    UnknownId(ProgressId),

    /// The node already finished and no longer accepts changes
    #[error("{0} is already completed, ignoring")]
    AlreadyCompleted(ProgressId),

    /// The requested parent was never issued by this stack
    #[error("parent {0} is not a known progress node, starting as a root instead")]
    InvalidParent(ProgressId),

    /// A node was started without an activity label
    #[error("progress activity must not be empty")]
    EmptyActivity,
}
