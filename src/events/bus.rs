//! Synchronous fan-out dispatcher for crawl events

use crate::events::{CrawlEvent, EventKind};

/// Which events a subscriber wants to receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    /// Every event
    All,
    /// A single event kind
    Only(EventKind),
    /// Any of the listed kinds
    Kinds(Vec<EventKind>),
}

impl Subscription {
    pub fn matches(&self, kind: EventKind) -> bool {
        match self {
            Self::All => true,
            Self::Only(only) => *only == kind,
            Self::Kinds(kinds) => kinds.contains(&kind),
        }
    }
}

impl From<EventKind> for Subscription {
    fn from(kind: EventKind) -> Self {
        Self::Only(kind)
    }
}

type Callback = Box<dyn FnMut(&CrawlEvent) + Send>;

/// Registration-ordered list of event subscribers
#[derive(Default)]
pub struct EventBus {
    observers: Vec<(Subscription, Callback)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for the events selected by `subscription`
    pub fn subscribe<F>(&mut self, subscription: impl Into<Subscription>, callback: F)
    where
        F: FnMut(&CrawlEvent) + Send + 'static,
    {
        self.observers
            .push((subscription.into(), Box::new(callback)));
    }

    /// Delivers `event` to every matching subscriber, in registration order
    pub fn emit(&mut self, event: &CrawlEvent) {
        let kind = event.kind();
        tracing::trace!("emit {} to {} observers", kind, self.observers.len());
        for (subscription, callback) in self.observers.iter_mut() {
            if subscription.matches(kind) {
                callback(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}
