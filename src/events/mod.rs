//! Crawl lifecycle notifications
//!
//! The coordinator announces every lifecycle step as a [`CrawlEvent`] on an
//! [`EventBus`]. Delivery is synchronous and in subscriber registration order,
//! so collaborators observe events in exactly the order they were raised.

mod bus;

pub use bus::{EventBus, Subscription};

use crate::resource::ResourceNode;
use crate::state::Depth;
use crate::CrawlFailure;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Discriminant of a [`CrawlEvent`], used to filter subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CrawlStarted,
    CrawlResourceComplete,
    ResourceLoaded,
    CollectionIndex,
    CrawlDepthComplete,
    CrawlError,
    CrawlComplete,
}

impl EventKind {
    /// The wire name of the event, e.g. `resource-loaded`
    pub fn name(&self) -> &'static str {
        match self {
            Self::CrawlStarted => "crawl-started",
            Self::CrawlResourceComplete => "crawl-resource-complete",
            Self::ResourceLoaded => "resource-loaded",
            Self::CollectionIndex => "collection-index",
            Self::CrawlDepthComplete => "crawl-depth-complete",
            Self::CrawlError => "crawl-error",
            Self::CrawlComplete => "crawl-complete",
        }
    }

    /// Parses a wire name back into a kind
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|kind| kind.name() == name)
    }

    pub fn all() -> [Self; 7] {
        [
            Self::CrawlStarted,
            Self::CrawlResourceComplete,
            Self::ResourceLoaded,
            Self::CollectionIndex,
            Self::CrawlDepthComplete,
            Self::CrawlError,
            Self::CrawlComplete,
        ]
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lifecycle notification raised by the coordinator
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    /// A fetch for `path` has been scheduled
    CrawlStarted { path: String },

    /// The raw document for `path` arrived and decoded as JSON
    CrawlResourceComplete { path: String, raw: Arc<Value> },

    /// A single resource was registered under `path`
    ResourceLoaded {
        path: String,
        node: Arc<ResourceNode>,
    },

    /// A collection was registered; its children follow as `ResourceLoaded`
    CollectionIndex { collection: Arc<ResourceNode> },

    /// The fetched node for `path` has been registered at `depth`
    CrawlDepthComplete {
        path: String,
        node: Arc<ResourceNode>,
        depth: Depth,
    },

    /// `path` failed and will not be retried
    CrawlError { path: String, error: CrawlFailure },

    /// Nothing is pending or in flight any more
    CrawlComplete,
}

impl CrawlEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CrawlStarted { .. } => EventKind::CrawlStarted,
            Self::CrawlResourceComplete { .. } => EventKind::CrawlResourceComplete,
            Self::ResourceLoaded { .. } => EventKind::ResourceLoaded,
            Self::CollectionIndex { .. } => EventKind::CollectionIndex,
            Self::CrawlDepthComplete { .. } => EventKind::CrawlDepthComplete,
            Self::CrawlError { .. } => EventKind::CrawlError,
            Self::CrawlComplete => EventKind::CrawlComplete,
        }
    }

    /// The wire name of the event
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// The path the event concerns, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::CrawlStarted { path }
            | Self::CrawlResourceComplete { path, .. }
            | Self::ResourceLoaded { path, .. }
            | Self::CrawlDepthComplete { path, .. }
            | Self::CrawlError { path, .. } => Some(path),
            Self::CollectionIndex { collection } => Some(collection.canonical_path()),
            Self::CrawlComplete => None,
        }
    }
}
