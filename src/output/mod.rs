//! Output collaborators for crawl events
//!
//! This module handles:
//! - Persisting loaded resources, slugs and collection indexes to disk
//! - Transforming resources into compact documents
//! - Logging crawl progress and recording crawl statistics

mod extractor;
mod logger;
pub mod stats;
mod traits;
mod transform;

pub use extractor::{output_file, Extractor, INDEXES_DIR, RESOURCES_DIR, SLUGS_DIR};
pub use logger::CrawlLogger;
pub use stats::{print_summary, CrawlDigest, ExtractorStats};
pub use traits::{CrawlSummary, OutputError, OutputResult, Transform};
pub use transform::{
    Transformer, DEFAULT_ATTRIBUTE_FILTERS, DEFAULT_FIELD_PROPERTY_FILTERS,
    DEFAULT_RELATIONSHIP_FILTERS,
};
