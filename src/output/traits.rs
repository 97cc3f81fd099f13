//! Output traits and types
//!
//! This module defines the transform seam used by the extractor and the
//! summary assembled at the end of a crawl.

use crate::crawler::CrawlReport;
use crate::output::stats::{CrawlDigest, ExtractorStats};
use crate::resource::ResourceNode;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid field filter: {0}")]
    InvalidFilter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Renders a resource node into the document written to disk
///
/// Any `Fn(&ResourceNode) -> Value` closure is a transform.
pub trait Transform: Send {
    fn transform(&self, node: &ResourceNode) -> Value;
}

impl<F> Transform for F
where
    F: Fn(&ResourceNode) -> Value + Send,
{
    fn transform(&self, node: &ResourceNode) -> Value {
        self(node)
    }
}

/// Everything known about a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Registry counts and timing
    pub report: CrawlReport,

    /// Per-entity load counts and failures seen by the logger
    pub digest: CrawlDigest,

    /// Files written by the extractor
    pub files: ExtractorStats,
}

impl CrawlSummary {
    /// Returns the success rate over all terminal paths, as a percentage
    pub fn success_rate(&self) -> f64 {
        let terminal = self.report.visited + self.report.errored;
        if terminal == 0 {
            return 0.0;
        }
        (self.report.visited as f64 / terminal as f64) * 100.0
    }
}
