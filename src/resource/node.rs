//! Normalized resource node
//!
//! A [`ResourceNode`] is built once from a decoded JSON:API document (or from
//! one element of a collection's `data` array) and never changes afterwards,
//! apart from the transformed output which a collaborator may set exactly once.

use crate::resource::links::{collect_stub_paths, id_string, link_path, stub_path, TYPE_SEPARATOR};
use crate::resource::{NormalizeError, ResourceConfig};
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

/// Attribute keys holding the backend's internal numeric id
fn internal_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^drupal_internal__[ntfm]?id").expect("static pattern"))
}

/// Shape of the normalized payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A single resource object
    Single,
    /// An array of resource objects
    Collection,
    /// An empty (null) document, e.g. an unset to-one relationship
    Null,
}

/// Identity of a single resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Entity type, the part of the compound type before the separator
    pub entity_type: String,
    /// Bundle, the part after the separator
    pub bundle: String,
    /// Internal id when exposed, otherwise the resource id member
    pub id: String,
}

/// Normalized representation of one API payload
#[derive(Debug)]
pub struct ResourceNode {
    kind: ResourceKind,
    data: Value,
    identity: Option<Identity>,
    uuid: Option<String>,
    canonical_path: String,
    alias_paths: Vec<String>,
    attributes: Map<String, Value>,
    relationships: Map<String, Value>,
    relationship_urls: Vec<String>,
    pagination_next: Option<String>,
    children: Vec<Arc<ResourceNode>>,
    transformed: OnceLock<Value>,
}

impl ResourceNode {
    /// Normalizes a decoded response document
    ///
    /// # Arguments
    ///
    /// * `raw` - The decoded response body
    /// * `request_path` - The relative path the document was fetched from
    /// * `config` - Relationship filters, page entity and API prefix
    ///
    /// # Returns
    ///
    /// * `Ok(ResourceNode)` - A single, collection or null node
    /// * `Err(NormalizeError)` - The payload lacks the minimal type/id shape
    pub fn from_payload(
        raw: &Value,
        request_path: &str,
        config: &ResourceConfig,
    ) -> Result<Self, NormalizeError> {
        match raw.get("data") {
            Some(Value::Array(items)) => Self::collection(raw, items, request_path, config),
            Some(Value::Null) => Ok(Self::null(request_path)),
            Some(data @ Value::Object(_)) => Self::single(data, config),
            Some(_) => Err(NormalizeError::MissingData),
            // Collection items carry type/id at the top level
            None if raw.get("type").is_some() => Self::single(raw, config),
            None => Err(NormalizeError::MissingData),
        }
    }

    fn null(request_path: &str) -> Self {
        Self {
            kind: ResourceKind::Null,
            data: Value::Null,
            identity: None,
            uuid: None,
            canonical_path: request_path.to_string(),
            alias_paths: Vec::new(),
            attributes: Map::new(),
            relationships: Map::new(),
            relationship_urls: Vec::new(),
            pagination_next: None,
            children: Vec::new(),
            transformed: OnceLock::new(),
        }
    }

    fn single(data: &Value, config: &ResourceConfig) -> Result<Self, NormalizeError> {
        let type_name = data
            .get("type")
            .and_then(Value::as_str)
            .ok_or(NormalizeError::MissingMember("type"))?;
        let uuid = data
            .get("id")
            .and_then(id_string)
            .ok_or(NormalizeError::MissingMember("id"))?;
        let (entity_type, bundle) = type_name
            .split_once(TYPE_SEPARATOR)
            .ok_or_else(|| NormalizeError::InvalidType(type_name.to_string()))?;

        let attributes = match data.get("attributes") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        let relationships = match data.get("relationships") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        let id = attributes
            .iter()
            .find(|(key, _)| internal_id_pattern().is_match(key))
            .and_then(|(_, value)| id_string(value))
            .unwrap_or_else(|| uuid.clone());

        let mut alias_paths = Vec::new();
        if entity_type == config.page_entity {
            if let Some(alias) = attributes
                .get("path")
                .and_then(|path| path.get("alias"))
                .and_then(Value::as_str)
                .filter(|alias| !alias.is_empty())
            {
                alias_paths.push(percent_decode_str(alias).decode_utf8_lossy().into_owned());
            }
            alias_paths.push(format!("/{}/{}", entity_type, id));
        }

        let relationship_urls = Self::extract_relationship_urls(&relationships, config);

        Ok(Self {
            kind: ResourceKind::Single,
            data: data.clone(),
            identity: Some(Identity {
                entity_type: entity_type.to_string(),
                bundle: bundle.to_string(),
                id,
            }),
            canonical_path: stub_path(type_name, &uuid),
            uuid: Some(uuid),
            alias_paths,
            attributes,
            relationships,
            relationship_urls,
            pagination_next: None,
            children: Vec::new(),
            transformed: OnceLock::new(),
        })
    }

    fn collection(
        raw: &Value,
        items: &[Value],
        request_path: &str,
        config: &ResourceConfig,
    ) -> Result<Self, NormalizeError> {
        let links = raw.get("links");
        let canonical_path = links
            .and_then(|links| links.get("self"))
            .and_then(|link| link_path(link, &config.api_prefix))
            .unwrap_or_else(|| request_path.to_string());
        let pagination_next = links
            .and_then(|links| links.get("next"))
            .and_then(|link| link_path(link, &config.api_prefix));

        let children = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                Self::single(item, config)
                    .map(Arc::new)
                    .map_err(|source| NormalizeError::Item {
                        index,
                        source: Box::new(source),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            kind: ResourceKind::Collection,
            data: Value::Array(items.to_vec()),
            identity: None,
            uuid: None,
            canonical_path,
            alias_paths: Vec::new(),
            attributes: Map::new(),
            relationships: Map::new(),
            relationship_urls: Vec::new(),
            pagination_next,
            children,
            transformed: OnceLock::new(),
        })
    }

    /// Collects stub paths from relationships whose name matches a pattern
    fn extract_relationship_urls(
        relationships: &Map<String, Value>,
        config: &ResourceConfig,
    ) -> Vec<String> {
        let mut urls = Vec::new();
        let mut seen = HashSet::new();
        for (name, value) in relationships {
            if config.relationships.iter().any(|p| p.is_match(name)) {
                collect_stub_paths(value, &mut urls, &mut seen);
            }
        }
        urls
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn is_single(&self) -> bool {
        self.kind == ResourceKind::Single
    }

    pub fn is_collection(&self) -> bool {
        self.kind == ResourceKind::Collection
    }

    pub fn is_null(&self) -> bool {
        self.kind == ResourceKind::Null
    }

    /// Identity triple; `None` unless this is a single resource
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.entity_type.as_str())
    }

    pub fn bundle(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.bundle.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.id.as_str())
    }

    /// The resource `id` member (a UUID on Drupal backends)
    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    pub fn canonical_path(&self) -> &str {
        &self.canonical_path
    }

    /// Human-friendly paths for slug publication, canonical fallback last
    pub fn alias_paths(&self) -> &[String] {
        &self.alias_paths
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Raw relationship values keyed by relationship name
    pub fn relationship_stubs(&self) -> &Map<String, Value> {
        &self.relationships
    }

    /// Deduplicated paths of related resources eligible for traversal
    pub fn relationship_urls(&self) -> &[String] {
        &self.relationship_urls
    }

    pub fn pagination_next(&self) -> Option<&str> {
        self.pagination_next.as_deref()
    }

    /// Embedded children of a collection; a single yields itself
    pub fn children(self: &Arc<Self>) -> Vec<Arc<ResourceNode>> {
        match self.kind {
            ResourceKind::Collection => self.children.clone(),
            ResourceKind::Single => vec![Arc::clone(self)],
            ResourceKind::Null => Vec::new(),
        }
    }

    /// The normalized data: resource object, item array or null
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Stores the collaborator-rendered output
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The output was set
    /// * `Err(Value)` - Output had already been set; the rejected value is returned
    pub fn set_transformed_output(&self, output: Value) -> Result<(), Value> {
        self.transformed.set(output)
    }

    pub fn has_transformed_output(&self) -> bool {
        self.transformed.get().is_some()
    }

    /// Transformed output, or the normalized data if none was set
    pub fn transformed_output(&self) -> &Value {
        self.transformed.get().unwrap_or(&self.data)
    }
}
