//! Field-filtering transform for single resources
//!
//! Produces the compact document written by the extractor:
//!
//! ```json
//! {"id": "7", "entity": "node", "bundle": "article", "guid": "6f1c...",
//!  "paths": ["/blog/hello", "/node/7"], "fields": {"title": "Hello"}}
//! ```

use crate::config::TransformConfig;
use crate::output::traits::{OutputError, OutputResult, Transform};
use crate::resource::ResourceNode;
use regex::Regex;
use serde_json::{json, Map, Value};

/// Attributes kept by default
pub const DEFAULT_ATTRIBUTE_FILTERS: [&str; 4] = [
    "^field_",
    "^(title|created|changed|langcode|body)$",
    "^(name|weight|description)$",
    "^(parent_type|parent_id)$",
];

/// Relationships kept by default
pub const DEFAULT_RELATIONSHIP_FILTERS: [&str; 1] = ["^field_"];

/// Properties removed from object-valued fields by default
pub const DEFAULT_FIELD_PROPERTY_FILTERS: [&str; 1] = ["^links$"];

#[derive(Debug, Clone)]
pub struct Transformer {
    attribute_filters: Vec<Regex>,
    relationship_filters: Vec<Regex>,
    field_property_filters: Vec<Regex>,
}

impl Transformer {
    /// Builds a transformer with the built-in filters plus `config`'s extras
    ///
    /// # Returns
    ///
    /// * `Ok(Transformer)` - All patterns compiled
    /// * `Err(OutputError::InvalidFilter)` - A configured pattern is invalid
    pub fn from_config(config: &TransformConfig) -> OutputResult<Self> {
        Ok(Self {
            attribute_filters: compile(&DEFAULT_ATTRIBUTE_FILTERS, &config.attribute_filters)?,
            relationship_filters: compile(
                &DEFAULT_RELATIONSHIP_FILTERS,
                &config.relationship_filters,
            )?,
            field_property_filters: compile(
                &DEFAULT_FIELD_PROPERTY_FILTERS,
                &config.field_property_filters,
            )?,
        })
    }

    /// Kept attributes and relationships, with noisy properties stripped
    pub fn fields(&self, node: &ResourceNode) -> Map<String, Value> {
        let mut fields: Map<String, Value> = node
            .attributes()
            .iter()
            .filter(|(key, _)| matches_any(&self.attribute_filters, key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for (key, value) in node.relationship_stubs() {
            if matches_any(&self.relationship_filters, key) {
                fields.insert(key.clone(), value.clone());
            }
        }

        for value in fields.values_mut() {
            if let Value::Object(properties) = value {
                properties.retain(|key, _| !matches_any(&self.field_property_filters, key));
            }
        }

        fields
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::from_config(&TransformConfig::default()).expect("built-in filters compile")
    }
}

impl Transform for Transformer {
    /// Non-single nodes are passed through as their normalized data
    fn transform(&self, node: &ResourceNode) -> Value {
        let Some(identity) = node.identity() else {
            return node.data().clone();
        };

        json!({
            "id": identity.id,
            "entity": identity.entity_type,
            "bundle": identity.bundle,
            "guid": node.uuid(),
            "paths": node.alias_paths(),
            "fields": self.fields(node),
        })
    }
}

fn compile(defaults: &[&str], extra: &[String]) -> OutputResult<Vec<Regex>> {
    defaults
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
        .map(|pattern| {
            Regex::new(pattern)
                .map_err(|e| OutputError::InvalidFilter(format!("'{}': {}", pattern, e)))
        })
        .collect()
}

fn matches_any(filters: &[Regex], key: &str) -> bool {
    filters.iter().any(|f| f.is_match(key))
}
