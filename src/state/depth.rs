//! Depth budget for relationship traversal

use std::fmt;

/// Remaining number of relationship hops a traversal may take
///
/// A budget of `Limited(1)` fetches the requested path (and any collection it
/// embeds) but follows no relationships. Pagination never consumes budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// Crawl the whole reachable graph
    #[default]
    Unbounded,

    /// Crawl at most this many levels, counting the current one
    Limited(u32),
}

impl Depth {
    /// Creates a limited budget; zero is clamped to one
    pub fn limited(levels: u32) -> Self {
        Self::Limited(levels.max(1))
    }

    /// Converts an optional configured limit, `None` meaning unbounded
    pub fn from_limit(limit: Option<u32>) -> Self {
        limit.map(Self::limited).unwrap_or(Self::Unbounded)
    }

    /// Returns the same budget with a zero limit raised to one
    pub fn clamped(self) -> Self {
        match self {
            Self::Limited(0) => Self::Limited(1),
            other => other,
        }
    }

    /// Returns true if relationships of a node at this depth may be followed
    pub fn allows_hop(&self) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Limited(levels) => *levels > 1,
        }
    }

    /// Returns the budget one relationship hop further down
    pub fn descend(self) -> Self {
        match self {
            Self::Unbounded => Self::Unbounded,
            Self::Limited(levels) => Self::Limited(levels.saturating_sub(1).max(1)),
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Limited(levels) => write!(f, "{}", levels),
        }
    }
}
