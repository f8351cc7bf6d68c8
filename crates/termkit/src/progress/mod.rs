//! Nested progress tracking
//!
//! - [`node`]: the node data model and update arguments
//! - [`stack`]: lifecycle, soft-failure policy and log coordination
//! - [`render`]: frame computation and console drawing

pub mod node;
pub mod render;
pub mod stack;

pub use node::{
    Completion, Metrics, NewProgress, ProgressId, ProgressNode, ProgressUpdate, clamp_percent,
};
pub use render::{FrameLine, RenderMode, build_frame, depth_of};
pub use stack::{DEFAULT_RETENTION, ProgressStack, StackOptions, StackStats};
