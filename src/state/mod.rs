//! State module for tracking crawl progress
//!
//! This module provides the per-target state machine used by the coordinator.
//!
//! # Components
//!
//! - `TargetState`: Pending, Resolving, Fetching, Parsing and the terminal states
//! - `TargetLifecycle`: A labelled target whose transitions are checked

mod target_state;

// Re-export main types
pub use target_state::{TargetLifecycle, TargetState};
