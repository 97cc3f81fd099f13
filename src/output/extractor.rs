//! File-system persistence of loaded resources
//!
//! Layout under the output location:
//!
//! - `_resources/<canonical path>.json` for every single resource
//! - `_slugs/<alias path>.json` for every alias of a page entity
//! - `_indexes/<collection path>.json` listing each collection page
//!
//! Write failures are logged and counted; they never stop the crawl.

use crate::config::{OutputConfig, TransformConfig};
use crate::crawler::Coordinator;
use crate::events::{CrawlEvent, EventKind, Subscription};
use crate::output::stats::ExtractorStats;
use crate::output::traits::{OutputError, OutputResult, Transform};
use crate::output::transform::Transformer;
use crate::resource::ResourceNode;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const RESOURCES_DIR: &str = "_resources";
pub const SLUGS_DIR: &str = "_slugs";
pub const INDEXES_DIR: &str = "_indexes";

/// Writes resources announced by a coordinator to disk
pub struct Extractor {
    location: PathBuf,
    wipe: bool,
    clean: bool,
    transform: Box<dyn Transform>,
    prepared: bool,
}

impl Extractor {
    /// Creates an extractor writing cleaned documents under `location`
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            wipe: false,
            clean: true,
            transform: Box::new(Transformer::default()),
            prepared: false,
        }
    }

    /// Creates an extractor from the `[output]` and `[transform]` sections
    pub fn from_config(output: &OutputConfig, transform: &TransformConfig) -> OutputResult<Self> {
        Ok(Self::new(&output.location)
            .with_wipe(output.wipe)
            .with_clean(output.clean)
            .with_transform(Transformer::from_config(transform)?))
    }

    /// Remove the location before the first write
    pub fn with_wipe(mut self, wipe: bool) -> Self {
        self.wipe = wipe;
        self
    }

    /// Write transformed documents (`true`) or raw resource data (`false`)
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Subscribes to `resource-loaded` and `collection-index` events
    ///
    /// Returns a handle to the write counters.
    pub fn attach(mut self, coordinator: &mut Coordinator) -> Arc<Mutex<ExtractorStats>> {
        let shared = Arc::new(Mutex::new(ExtractorStats::default()));
        let stats = Arc::clone(&shared);
        coordinator.subscribe(
            Subscription::Kinds(vec![EventKind::ResourceLoaded, EventKind::CollectionIndex]),
            move |event: &CrawlEvent| {
                let mut stats = match stats.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                self.handle(event, &mut stats);
            },
        );
        shared
    }

    /// Persists whatever `event` announces, updating `stats`
    pub fn handle(&mut self, event: &CrawlEvent, stats: &mut ExtractorStats) {
        if let Err(e) = self.prepare() {
            tracing::error!("Could not prepare {}: {}", self.location.display(), e);
            stats.failures += 1;
            return;
        }

        match event {
            CrawlEvent::ResourceLoaded { node, .. } => self.save_resource(node, stats),
            CrawlEvent::CollectionIndex { collection } => match self.save_index(collection) {
                Ok(()) => stats.indexes_written += 1,
                Err(e) => {
                    tracing::warn!("Index for {} not written: {}", collection.canonical_path(), e);
                    stats.failures += 1;
                }
            },
            _ => {}
        }
    }

    /// Wipes the location once, before anything is written
    fn prepare(&mut self) -> OutputResult<()> {
        if self.prepared {
            return Ok(());
        }
        self.prepared = true;

        if self.wipe {
            match std::fs::remove_dir_all(&self.location) {
                Ok(()) => tracing::info!("Wiped {}", self.location.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn save_resource(&self, node: &ResourceNode, stats: &mut ExtractorStats) {
        if self.clean && !node.has_transformed_output() {
            // Another extractor may have rendered it first; keep that output
            let _ = node.set_transformed_output(self.transform.transform(node));
        }
        let document = node.transformed_output();

        let file = output_file(&self.location, RESOURCES_DIR, node.canonical_path());
        match write_json(&file, document) {
            Ok(()) => stats.resources_written += 1,
            Err(e) => {
                tracing::warn!("{}", e);
                stats.failures += 1;
            }
        }

        for alias in node.alias_paths() {
            let file = output_file(&self.location, SLUGS_DIR, alias);
            match write_json(&file, document) {
                Ok(()) => stats.slugs_written += 1,
                Err(e) => {
                    tracing::warn!("{}", e);
                    stats.failures += 1;
                }
            }
        }
    }

    fn save_index(&self, collection: &Arc<ResourceNode>) -> OutputResult<()> {
        let items: Vec<String> = collection
            .children()
            .iter()
            .map(|child| child.canonical_path().to_string())
            .collect();
        let index = json!({
            "path": collection.canonical_path(),
            "items": items,
            "next": collection.pagination_next(),
        });
        write_json(
            &output_file(&self.location, INDEXES_DIR, collection.canonical_path()),
            &index,
        )
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("location", &self.location)
            .field("wipe", &self.wipe)
            .field("clean", &self.clean)
            .finish()
    }
}

/// Maps an API path to a `.json` file under `location/section`
///
/// Empty, `.` and `..` segments are dropped so nothing escapes the section
/// directory; characters outside `[alnum - _ .]` become `_`.
pub fn output_file(location: &Path, section: &str, api_path: &str) -> PathBuf {
    let segments: Vec<String> = api_path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .map(sanitize_segment)
        .collect();

    let mut file = location.join(section);
    match segments.split_last() {
        Some((last, dirs)) => {
            for dir in dirs {
                file.push(dir);
            }
            file.push(format!("{}.json", last));
        }
        None => file.push("index.json"),
    }
    file
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn write_json(file: &Path, value: &Value) -> OutputResult<()> {
    let wrap = |source: std::io::Error| OutputError::Write {
        path: file.display().to_string(),
        source,
    };

    if let Some(dir) = file.parent() {
        std::fs::create_dir_all(dir).map_err(wrap)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(file, body).map_err(wrap)
}
