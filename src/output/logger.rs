//! Console logging of crawl events

use crate::crawler::Coordinator;
use crate::events::{CrawlEvent, Subscription};
use crate::output::stats::CrawlDigest;
use std::sync::{Arc, Mutex};

/// Logs every crawl event through `tracing` and keeps a [`CrawlDigest`]
#[derive(Debug, Default)]
pub struct CrawlLogger {
    digest: CrawlDigest,
}

impl CrawlLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to all events of `coordinator`
    ///
    /// Returns a handle to the digest, readable once the run has finished.
    pub fn attach(self, coordinator: &mut Coordinator) -> Arc<Mutex<CrawlDigest>> {
        let shared = Arc::new(Mutex::new(self.digest));
        let digest = Arc::clone(&shared);
        coordinator.subscribe(Subscription::All, move |event: &CrawlEvent| {
            let mut digest = match digest.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            log_event(event, &mut digest);
        });
        shared
    }

    /// Logs one event without a coordinator
    pub fn log(&mut self, event: &CrawlEvent) {
        log_event(event, &mut self.digest);
    }

    pub fn digest(&self) -> &CrawlDigest {
        &self.digest
    }
}

fn log_event(event: &CrawlEvent, digest: &mut CrawlDigest) {
    match event {
        CrawlEvent::CrawlStarted { path } => tracing::debug!("Fetching {}", path),
        CrawlEvent::CrawlResourceComplete { path, .. } => tracing::trace!("Received {}", path),
        CrawlEvent::ResourceLoaded { path, node } => {
            let entity = node.entity_type().unwrap_or("unknown");
            digest.record_loaded(entity);
            tracing::info!(
                "✔ {}/{}: {} ({})",
                entity,
                node.bundle().unwrap_or("-"),
                node.id().unwrap_or("-"),
                path
            );
        }
        CrawlEvent::CollectionIndex { collection } => {
            digest.collections += 1;
            tracing::debug!(
                "Collection {} with {} items{}",
                collection.canonical_path(),
                collection.children().len(),
                if collection.pagination_next().is_some() {
                    ", more pages follow"
                } else {
                    ""
                }
            );
        }
        CrawlEvent::CrawlDepthComplete { path, depth, .. } => {
            tracing::trace!("Registered {} at depth {}", path, depth)
        }
        CrawlEvent::CrawlError { path, error } => {
            digest.record_error(path, error);
            tracing::warn!("⚠ {}: {}", path, error);
        }
        CrawlEvent::CrawlComplete => {
            tracing::info!(
                "🎉 Crawl complete! {} resources loaded, {} errors",
                digest.total_loaded(),
                digest.error_count()
            );
        }
    }
}
