//! Call graphs rooted at an entry point, one at a time or per process event.
pub mod builder;
pub mod events;
pub mod model;
pub mod walker;

use thiserror::Error;

pub use builder::{BuildOptions, CallGraphBuilder, MAX_DEPTH_LIMIT, MIN_DEPTH_LIMIT};
pub use events::EventBuilder;
pub use model::{
    CallEdge, CallGraph, CallNode, CallType, EventCallGraphSet, NodeKind, SetStats, Stats,
};
pub use walker::{CallWalker, WalkResults};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("max depth must be between 1 and 50, got {0}")]
    InvalidMaxDepth(usize),

    #[error("symbol index is empty; index a source tree first")]
    EmptyIndex,

    #[error("entry point not found in code: {0}")]
    EntryPointNotFound(String),

    #[error("invalid exclude pattern: {0}")]
    InvalidExcludePattern(#[from] globset::Error),

    #[error("context not found: {0:?}")]
    ContextNotFound(String),
}
