//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PathState`: Tracks the state of individual canonical paths (pending, visited, errored)
//! - `Depth`: The relationship-hop budget carried by every crawl request

mod depth;
mod path_state;

// Re-export main types
pub use depth::Depth;
pub use path_state::PathState;
