use crate::resource::{DEFAULT_PAGE_ENTITY, DEFAULT_RELATIONSHIP_PATTERN};
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for jsonapi-spider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

/// Connection and traversal settings for the JSON:API backend
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API, e.g. `https://cms.example.com/jsonapi`
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    /// Maximum number of concurrent fetches
    #[serde(rename = "max-concurrent", default = "default_max_concurrent")]
    pub max_concurrent: u32,

    /// HTTP request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Halt the whole run on the first failed path
    #[serde(rename = "terminate-on-error", default)]
    pub terminate_on_error: bool,

    /// Relationship name patterns eligible for traversal
    #[serde(default = "default_relationships")]
    pub relationships: Vec<String>,

    /// Entity type whose resources get slug paths
    #[serde(rename = "page-entity", default = "default_page_entity")]
    pub page_entity: String,
}

impl ApiConfig {
    /// Creates an API config with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout_secs(),
            terminate_on_error: false,
            relationships: default_relationships(),
            page_entity: default_page_entity(),
        }
    }
}

/// What to crawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlConfig {
    /// Relationship hop budget; absent means unbounded
    #[serde(default)]
    pub depth: Option<u32>,

    /// API-relative root paths, e.g. `/node/article`
    #[serde(default)]
    pub roots: Vec<String>,

    /// Entity kinds whose bundles are all crawled, e.g. `node`
    #[serde(default)]
    pub kinds: Vec<String>,
}

/// Where and how fetched resources are written
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Output directory
    #[serde(default = "default_location")]
    pub location: PathBuf,

    /// Remove the output directory before the first write
    #[serde(default)]
    pub wipe: bool,

    /// Write transformed documents instead of raw resource data
    #[serde(default = "default_clean")]
    pub clean: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            wipe: false,
            clean: default_clean(),
        }
    }
}

/// Extra field filters, added to the built-in ones
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformConfig {
    #[serde(rename = "attribute-filters", default)]
    pub attribute_filters: Vec<String>,

    #[serde(rename = "relationship-filters", default)]
    pub relationship_filters: Vec<String>,

    #[serde(rename = "field-property-filters", default)]
    pub field_property_filters: Vec<String>,
}

fn default_max_concurrent() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_relationships() -> Vec<String> {
    vec![DEFAULT_RELATIONSHIP_PATTERN.to_string()]
}

fn default_page_entity() -> String {
    DEFAULT_PAGE_ENTITY.to_string()
}

fn default_location() -> PathBuf {
    PathBuf::from("./dist")
}

fn default_clean() -> bool {
    true
}
