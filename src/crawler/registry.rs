//! Crawl registry: which paths are pending, visited or errored
//!
//! A path moves `unseen -> pending -> {visited | errored}` and never leaves a
//! terminal state. Embedded collection items skip `pending` and go straight to
//! `visited`. The registry is owned by a single coordinator and needs no locking.

use crate::resource::ResourceNode;
use crate::state::PathState;
use crate::CrawlFailure;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Registry {
    visited: HashMap<String, Arc<ResourceNode>>,
    pending: HashSet<String>,
    errored: HashMap<String, CrawlFailure>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `path`; `None` if it was never seen
    pub fn state(&self, path: &str) -> Option<PathState> {
        if self.visited.contains_key(path) {
            Some(PathState::Visited)
        } else if self.errored.contains_key(path) {
            Some(PathState::Errored)
        } else if self.pending.contains(path) {
            Some(PathState::Pending)
        } else {
            None
        }
    }

    /// Returns true if `path` is pending, visited or errored
    pub fn has_seen(&self, path: &str) -> bool {
        self.state(path).is_some()
    }

    /// Marks an unseen path as pending
    ///
    /// # Returns
    ///
    /// * `true` - The path was unseen and is now pending
    /// * `false` - The path was already known; nothing changed
    pub fn mark_pending(&mut self, path: &str) -> bool {
        if self.has_seen(path) {
            return false;
        }
        self.pending.insert(path.to_string())
    }

    /// Records `node` under `path`; first writer wins
    ///
    /// Returns false if the path already reached a terminal state.
    pub fn mark_visited(&mut self, path: &str, node: Arc<ResourceNode>) -> bool {
        if self.visited.contains_key(path) || self.errored.contains_key(path) {
            return false;
        }
        self.pending.remove(path);
        self.visited.insert(path.to_string(), node);
        true
    }

    /// Records the failure of `path`; write-once
    pub fn mark_errored(&mut self, path: &str, reason: CrawlFailure) -> bool {
        if self.visited.contains_key(path) || self.errored.contains_key(path) {
            return false;
        }
        self.pending.remove(path);
        self.errored.insert(path.to_string(), reason);
        true
    }

    pub fn get(&self, path: &str) -> Option<&Arc<ResourceNode>> {
        self.visited.get(path)
    }

    pub fn failure(&self, path: &str) -> Option<&CrawlFailure> {
        self.errored.get(path)
    }

    pub fn visited(&self) -> &HashMap<String, Arc<ResourceNode>> {
        &self.visited
    }

    pub fn errored(&self) -> &HashMap<String, CrawlFailure> {
        &self.errored
    }

    pub fn pending(&self) -> &HashSet<String> {
        &self.pending
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn errored_count(&self) -> usize {
        self.errored.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Counts of paths per state, in [`PathState::all_states`] order
    pub fn counts(&self) -> Vec<(PathState, usize)> {
        PathState::all_states()
            .into_iter()
            .map(|state| {
                let count = match state {
                    PathState::Pending => self.pending.len(),
                    PathState::Visited => self.visited.len(),
                    PathState::Errored => self.errored.len(),
                };
                (state, count)
            })
            .collect()
    }
}
