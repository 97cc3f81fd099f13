//! Configuration module for jsonapi-spider
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use jsonapi_spider::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("spider.toml")).unwrap();
//! println!("Crawling {:?} with depth {:?}", config.api.base_url, config.crawl.depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{ApiConfig, Config, CrawlConfig, OutputConfig, TransformConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_api_config};
