//! Path state definitions for tracking crawl progress
//!
//! Every canonical path moves through `unseen -> Pending -> {Visited | Errored}`
//! exactly once per run. "Unseen" is modelled as the absence of a state.

use std::fmt;

/// Represents the current state of a canonical path in the crawl registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathState {
    /// A fetch for this path has been requested and not yet resolved
    Pending,

    /// The path resolved to a registered resource node
    Visited,

    /// The fetch or normalization for this path failed
    Errored,
}

impl PathState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Visited)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Errored)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Visited => "visited",
            Self::Errored => "errored",
        }
    }

    /// Returns all possible path states
    pub fn all_states() -> [Self; 3] {
        [Self::Pending, Self::Visited, Self::Errored]
    }
}

impl fmt::Display for PathState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
