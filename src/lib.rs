//! jsonapi-spider: a relationship-aware JSON:API crawler
//!
//! This crate walks the resource graph exposed by a Drupal-style JSON:API
//! backend. Every reachable resource, plus a depth-bounded set of its
//! relationships, is normalized into a [`resource::ResourceNode`] and announced
//! on a synchronous event bus so collaborators can persist or log it.

pub mod config;
pub mod crawler;
pub mod events;
pub mod output;
pub mod resource;
pub mod state;

use thiserror::Error;

/// Main error type for spider operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Crawl terminated after failure at {path}: {reason}")]
    Terminated { path: String, reason: CrawlFailure },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("A base URL is required to crawl")]
    MissingBaseUrl,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid name pattern: {0}")]
    InvalidPattern(String),
}

/// Why a single path ended up in the errored set
///
/// Failures are values: they are recorded per path, carried by the
/// `crawl-error` event and never unwind through the scheduler.
#[derive(Debug, Clone, Error)]
pub enum CrawlFailure {
    #[error(transparent)]
    Fetch(#[from] crawler::FetchError),

    #[error("malformed payload: {0}")]
    Malformed(#[from] resource::NormalizeError),

    #[error("fetch task panicked: {0}")]
    Panicked(String),

    #[error("discovery failed: {0}")]
    Discovery(String),
}

/// Result type alias for spider operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator, CrawlReport};
pub use output::CrawlSummary;
pub use events::{CrawlEvent, EventKind, Subscription};
pub use resource::{ResourceKind, ResourceNode};
pub use state::{Depth, PathState};
