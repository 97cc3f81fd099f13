//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the control loop that coordinates the crawl:
//! - Deduplicating requested paths against the registry
//! - Submitting fetches to the bounded scheduler
//! - Normalizing responses and registering the resulting nodes
//! - Following relationship and pagination links with the right depth budget
//! - Announcing lifecycle events and detecting completion
//!
//! All registry mutation happens on the loop in [`Coordinator::run`]. Only the
//! HTTP fetches themselves run concurrently, so no locking is needed and the
//! run is finished exactly when the scheduler has nothing running or waiting.

use crate::config::{validate_api_config, ApiConfig, Config};
use crate::crawler::fetcher::{ApiClient, FetchError};
use crate::crawler::registry::Registry;
use crate::crawler::scheduler::{Scheduler, TaskOutcome};
use crate::events::{CrawlEvent, EventBus, Subscription};
use crate::output::{CrawlLogger, CrawlSummary, Extractor};
use crate::resource::{ResourceConfig, ResourceNode};
use crate::state::Depth;
use crate::{ConfigError, CrawlFailure, SpiderError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Attribute keys naming a bundle on `<kind>_type` discovery resources
const BUNDLE_KEYS: [&str; 3] = [
    "drupal_internal__type",
    "drupal_internal__vid",
    "drupal_internal__id",
];

/// Identifies a scheduled fetch
#[derive(Debug, Clone)]
struct FetchTicket {
    path: String,
    depth: Depth,
}

/// Outcome of one `run()`
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Paths registered as visited (fetched or embedded)
    pub visited: usize,
    /// Paths that failed
    pub errored: usize,
    /// Paths still pending; non-zero only after a halted run
    pub pending: usize,
    /// Fetches submitted to the scheduler
    pub fetches: u64,
    /// Relationship links found on fetched documents, followed or not
    pub related: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    client: ApiClient,
    resource_config: ResourceConfig,
    scheduler: Scheduler<FetchTicket, Result<Value, FetchError>>,
    registry: Registry,
    bus: EventBus,
    terminate_on_error: bool,
    /// Set once a failure halts a fail-fast run
    halted: Option<(String, CrawlFailure)>,
    fetches: u64,
    related: u64,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - API connection and traversal settings
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to accept crawl requests
    /// * `Err(SpiderError)` - Missing base URL, invalid settings or HTTP client failure
    pub fn new(config: ApiConfig) -> Result<Self, SpiderError> {
        validate_api_config(&config)?;
        let base_url = config.base_url.as_deref().ok_or(ConfigError::MissingBaseUrl)?;

        let client = ApiClient::new(base_url, config.timeout_secs)?;
        let resource_config = ResourceConfig::new(
            &config.relationships,
            config.page_entity.clone(),
            client.api_prefix(),
        )
        .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        tracing::debug!(
            "Coordinator for {} (prefix '{}', {} concurrent)",
            client.base_url(),
            client.api_prefix(),
            config.max_concurrent
        );

        Ok(Self {
            client,
            resource_config,
            scheduler: Scheduler::new(config.max_concurrent as usize),
            registry: Registry::new(),
            bus: EventBus::new(),
            terminate_on_error: config.terminate_on_error,
            halted: None,
            fetches: 0,
            related: 0,
        })
    }

    /// Registers an event subscriber
    ///
    /// Subscribers run synchronously on the control loop, in registration order.
    pub fn subscribe<F>(&mut self, subscription: impl Into<Subscription>, callback: F)
    where
        F: FnMut(&CrawlEvent) + Send + 'static,
    {
        self.bus.subscribe(subscription, callback);
    }

    /// Requests a crawl of `path` with the given depth budget
    ///
    /// The fetch is only scheduled here; call [`Coordinator::run`] to drive it.
    ///
    /// # Returns
    ///
    /// * `true` - A fetch was scheduled
    /// * `false` - The path was already seen, or the run has halted
    pub fn crawl(&mut self, path: &str, depth: Depth) -> bool {
        if let Some((failed, _)) = &self.halted {
            tracing::debug!("Ignoring {} after halt at {}", path, failed);
            return false;
        }

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        if !self.registry.mark_pending(&path) {
            tracing::trace!("Already seen: {}", path);
            return false;
        }

        let depth = depth.clamped();
        self.bus.emit(&CrawlEvent::CrawlStarted { path: path.clone() });

        let client = self.client.clone();
        let target = path.clone();
        self.scheduler
            .submit(FetchTicket { path, depth }, move || async move {
                client.fetch(&target).await
            });
        self.fetches += 1;
        true
    }

    /// Fetches the bundle list for `kind` and crawls every bundle collection
    ///
    /// Reads `/<kind>_type/<kind>_type` directly (outside the scheduler) and
    /// calls `crawl("/<kind>/<bundle>", depth)` for each bundle found.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of bundle collections newly scheduled
    /// * `Err(SpiderError)` - The discovery request failed
    pub async fn crawl_all_of_kind(
        &mut self,
        kind: &str,
        depth: Depth,
    ) -> Result<usize, SpiderError> {
        let discovery = format!("/{0}_type/{0}_type", kind);
        if self.halted.is_some() {
            return Ok(0);
        }

        let raw = match self.client.fetch(&discovery).await {
            Ok(raw) => raw,
            Err(err) => {
                self.handle_failure(&discovery, CrawlFailure::Fetch(err.clone()));
                return Err(err.into());
            }
        };

        let bundles = discover_bundles(&raw);
        if bundles.is_empty() {
            self.handle_failure(
                &discovery,
                CrawlFailure::Discovery(format!("no bundles found for {}", kind)),
            );
            return Ok(0);
        }

        tracing::info!("Discovered {} {} bundles", bundles.len(), kind);
        let scheduled = bundles
            .iter()
            .filter(|bundle| self.crawl(&format!("/{}/{}", kind, bundle), depth))
            .count();
        Ok(scheduled)
    }

    /// Drives every scheduled fetch to completion
    ///
    /// Emits `crawl-complete` exactly once when nothing is running or waiting.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl reached quiescence
    /// * `Err(SpiderError::Terminated)` - A failure halted a fail-fast run
    pub async fn run(&mut self) -> Result<CrawlReport, SpiderError> {
        let started_at = Utc::now();
        tracing::info!(
            "Starting crawl ({} fetches scheduled)",
            self.scheduler.in_flight() + self.scheduler.backlog_len()
        );

        loop {
            if let Some((path, reason)) = self.halted.clone() {
                let discarded = self.scheduler.drain().await;
                tracing::warn!(
                    "Crawl halted at {}; discarded {} in-flight fetches",
                    path,
                    discarded
                );
                return Err(SpiderError::Terminated { path, reason });
            }

            let Some((ticket, outcome)) = self.scheduler.next_completed().await else {
                break;
            };

            match outcome {
                TaskOutcome::Completed(Ok(raw)) => self.handle_payload(ticket, raw),
                TaskOutcome::Completed(Err(err)) => {
                    self.handle_failure(&ticket.path, CrawlFailure::Fetch(err))
                }
                TaskOutcome::Panicked(message) => {
                    self.handle_failure(&ticket.path, CrawlFailure::Panicked(message))
                }
            }
        }

        let report = self.report(started_at);
        tracing::info!(
            "Crawl complete: {} visited, {} errored, {} fetches",
            report.visited,
            report.errored,
            report.fetches
        );
        self.bus.emit(&CrawlEvent::CrawlComplete);
        Ok(report)
    }

    /// Handles a decoded response for a scheduled fetch
    fn handle_payload(&mut self, ticket: FetchTicket, raw: Value) {
        let FetchTicket { path, depth } = ticket;

        if self.registry.state(&path).map_or(false, |s| s.is_terminal()) {
            tracing::debug!("Discarding late arrival for {}", path);
            return;
        }

        let node = match ResourceNode::from_payload(&raw, &path, &self.resource_config) {
            Ok(node) => Arc::new(node),
            Err(err) => {
                self.handle_failure(&path, CrawlFailure::Malformed(err));
                return;
            }
        };

        self.bus.emit(&CrawlEvent::CrawlResourceComplete {
            path: path.clone(),
            raw: Arc::new(raw),
        });

        if self.register(&path, Arc::clone(&node), depth) {
            let related = self.relationship_urls(&node).len();
            self.related += related as u64;
            tracing::debug!(
                "{} registered at depth {} ({} related resources)",
                path,
                depth,
                related
            );
            self.bus
                .emit(&CrawlEvent::CrawlDepthComplete { path, node, depth });
        }
    }

    /// Records `node` under `path` and schedules whatever it links to
    ///
    /// Returns false if the path was already registered.
    fn register(&mut self, path: &str, node: Arc<ResourceNode>, depth: Depth) -> bool {
        if !self.registry.mark_visited(path, Arc::clone(&node)) {
            return false;
        }

        if node.is_single() {
            self.bus.emit(&CrawlEvent::ResourceLoaded {
                path: path.to_string(),
                node: Arc::clone(&node),
            });
            if depth.allows_hop() {
                for url in node.relationship_urls() {
                    self.crawl(url, depth.descend());
                }
            }
        } else if node.is_collection() {
            self.bus.emit(&CrawlEvent::CollectionIndex {
                collection: Arc::clone(&node),
            });
            for child in node.children() {
                let child_path = child.canonical_path().to_string();
                self.register(&child_path, child, depth);
            }
            // Pagination continues the same traversal level
            if let Some(next) = node.pagination_next() {
                self.crawl(next, depth);
            }
        } else {
            tracing::debug!("Empty document at {}", path);
        }

        true
    }

    /// Moves `path` to the errored set and announces the failure
    fn handle_failure(&mut self, path: &str, reason: CrawlFailure) {
        if !self.registry.mark_errored(path, reason.clone()) {
            tracing::debug!("Ignoring repeated failure for {}: {}", path, reason);
            return;
        }

        tracing::warn!("Failed {}: {}", path, reason);
        self.bus.emit(&CrawlEvent::CrawlError {
            path: path.to_string(),
            error: reason.clone(),
        });

        if self.terminate_on_error && self.halted.is_none() {
            let dropped = self.scheduler.clear_backlog();
            tracing::error!(
                "Terminating after failure at {} ({} queued fetches dropped)",
                path,
                dropped
            );
            self.halted = Some((path.to_string(), reason));
        }
    }

    fn report(&self, started_at: DateTime<Utc>) -> CrawlReport {
        CrawlReport {
            visited: self.registry.visited_count(),
            errored: self.registry.errored_count(),
            pending: self.registry.pending_count(),
            fetches: self.fetches,
            related: self.related,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Relationship paths of a single, or the union over a collection's children
    pub fn relationship_urls(&self, node: &Arc<ResourceNode>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for child in node.children() {
            for url in child.relationship_urls() {
                if seen.insert(url.clone()) {
                    urls.push(url.clone());
                }
            }
        }
        urls
    }

    /// Read-only view of the crawl registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns true once a failure has halted a fail-fast run
    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn resource_config(&self) -> &ResourceConfig {
        &self.resource_config
    }

    pub fn fetches(&self) -> u64 {
        self.fetches
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("base_url", &self.client.base_url())
            .field("in_flight", &self.scheduler.in_flight())
            .field("backlog", &self.scheduler.backlog_len())
            .field("visited", &self.registry.visited_count())
            .field("halted", &self.halted.is_some())
            .finish()
    }
}

/// Reads bundle machine names from a `<kind>_type` collection document
fn discover_bundles(raw: &Value) -> Vec<String> {
    let items = match raw.get("data") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(item @ Value::Object(_)) => std::slice::from_ref(item),
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| {
            let attributes = item.get("attributes")?;
            BUNDLE_KEYS
                .iter()
                .find_map(|key| attributes.get(*key).and_then(Value::as_str))
                .filter(|bundle| !bundle.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// Runs a complete crawl described by `config`
///
/// This is the main entry point used by the CLI. It will:
/// 1. Build the coordinator for the configured API
/// 2. Attach the crawl logger and the file extractor
/// 3. Schedule every configured root and every bundle of every configured kind
/// 4. Drive the crawl to completion
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl finished; per-path failures are in the summary
/// * `Err(SpiderError)` - Setup failed, or a fail-fast run was terminated
pub async fn run_crawl(config: &Config) -> Result<CrawlSummary, SpiderError> {
    let mut coordinator = Coordinator::new(config.api.clone())?;

    let digest = CrawlLogger::new().attach(&mut coordinator);
    let files = Extractor::from_config(&config.output, &config.transform)?.attach(&mut coordinator);

    let depth = Depth::from_limit(config.crawl.depth);
    for root in &config.crawl.roots {
        coordinator.crawl(root, depth);
    }

    for kind in &config.crawl.kinds {
        if let Err(e) = coordinator.crawl_all_of_kind(kind, depth).await {
            tracing::error!("Could not discover {} bundles: {}", kind, e);
        }
    }

    let report = coordinator.run().await?;

    let digest = digest
        .lock()
        .map(|d| d.clone())
        .unwrap_or_else(|poisoned| poisoned.into_inner().clone());
    let files = files
        .lock()
        .map(|f| f.clone())
        .unwrap_or_else(|poisoned| poisoned.into_inner().clone());

    Ok(CrawlSummary {
        report,
        digest,
        files,
    })
}
