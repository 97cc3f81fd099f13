//! Crawler module for JSON:API traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and error classification
//! - Bounded-concurrency task scheduling
//! - The per-run registry of pending, visited and errored paths
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod registry;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{build_http_client, ApiClient, FetchError, JSONAPI_MEDIA_TYPE};
pub use registry::Registry;
pub use scheduler::{Scheduler, TaskOutcome};
