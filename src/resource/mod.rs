//! Resource model for JSON:API payloads
//!
//! This module normalizes heterogeneous API documents into [`ResourceNode`]s:
//! - Single resources (`data` is an object, or a bare collection item)
//! - Collections, including paginated ones (`data` is an array)
//! - Null documents (`data` is null)
//!
//! It also provides the path helpers used to turn hrefs and relationship
//! stubs into API-relative canonical paths.

mod links;
mod node;

pub use links::{
    collect_stub_paths, id_string, link_path, relative_path, stub_path, stub_target,
    TYPE_SEPARATOR,
};
pub use node::{Identity, ResourceKind, ResourceNode};

use regex::Regex;
use thiserror::Error;

/// Default relationship name pattern: the conventional field prefix
pub const DEFAULT_RELATIONSHIP_PATTERN: &str = "^field_";

/// Default entity type whose resources get slug paths
pub const DEFAULT_PAGE_ENTITY: &str = "node";

/// Errors raised when a payload lacks the minimal JSON:API shape
#[derive(Debug, Clone, Error)]
pub enum NormalizeError {
    #[error("document has no resource data")]
    MissingData,

    #[error("resource object is missing its `{0}` member")]
    MissingMember(&'static str),

    #[error("type `{0}` is not an entity--bundle compound type")]
    InvalidType(String),

    #[error("collection item {index} is malformed: {source}")]
    Item {
        index: usize,
        source: Box<NormalizeError>,
    },
}

/// Settings that influence how payloads are normalized
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// Relationship names eligible for traversal
    pub relationships: Vec<Regex>,

    /// Entity type treated as a publishable page (gets alias paths)
    pub page_entity: String,

    /// Path component of the API base URL, stripped from link hrefs
    pub api_prefix: String,
}

impl ResourceConfig {
    /// Compiles relationship patterns into a config
    ///
    /// # Returns
    ///
    /// * `Ok(ResourceConfig)` - All patterns compiled
    /// * `Err(regex::Error)` - A pattern is not a valid regular expression
    pub fn new(
        patterns: &[String],
        page_entity: impl Into<String>,
        api_prefix: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let relationships = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            relationships,
            page_entity: page_entity.into(),
            api_prefix: api_prefix.into(),
        })
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            relationships: vec![Regex::new(DEFAULT_RELATIONSHIP_PATTERN).expect("static pattern")],
            page_entity: DEFAULT_PAGE_ENTITY.to_string(),
            api_prefix: "/jsonapi".to_string(),
        }
    }
}
