//! Path helpers for JSON:API link and linkage objects
//!
//! Everything the crawler tracks is an API-relative path such as
//! `/node/article/6f1c...` or `/node/article?page[offset]=50`. These helpers
//! convert absolute `links` hrefs and `{type, id}` stubs into that form.

use serde_json::Value;
use std::collections::HashSet;
use url::Url;

/// Separator between entity type and bundle in a compound type string
pub const TYPE_SEPARATOR: &str = "--";

/// Builds the canonical path for a compound type and resource id
///
/// # Examples
///
/// ```
/// use jsonapi_spider::resource::stub_path;
///
/// assert_eq!(stub_path("taxonomy_term--tags", "42"), "/taxonomy_term/tags/42");
/// ```
pub fn stub_path(type_name: &str, id: &str) -> String {
    format!("/{}/{}", type_name.replacen(TYPE_SEPARATOR, "/", 1), id)
}

/// Converts an absolute or relative href into an API-relative path
///
/// The API prefix (the path component of the configured base URL, e.g.
/// `/jsonapi`) is stripped and bracket escapes in the query are decoded, so a
/// pagination link like `https://cms/jsonapi/node/article?page%5Boffset%5D=50`
/// becomes `/node/article?page[offset]=50`. Every other escape is kept, since
/// the path is fetched again as-is and a decoded `&`, `#` or `+` would change
/// the request.
///
/// # Returns
///
/// * `Some(String)` - The relative path
/// * `None` - The href could not be interpreted as a URL or path
pub fn relative_path(href: &str, api_prefix: &str) -> Option<String> {
    let (path, query) = match Url::parse(href) {
        Ok(url) => (url.path().to_string(), url.query().map(str::to_string)),
        Err(_) if href.starts_with('/') => match href.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (href.to_string(), None),
        },
        Err(_) => return None,
    };

    let prefix = api_prefix.trim_end_matches('/');
    let stripped = if prefix.is_empty() {
        path.as_str()
    } else {
        match path.strip_prefix(prefix) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path.as_str(),
        }
    };

    let mut relative = format!("/{}", stripped.trim_start_matches('/'));
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        relative.push('?');
        relative.push_str(&decode_brackets(&query));
    }
    Some(relative)
}

/// Decodes `%5B`/`%5D` (either case) into `[`/`]`
fn decode_brackets(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut rest = query;
    while let Some(at) = rest.find('%') {
        out.push_str(&rest[..at]);
        let escape = rest.get(at..at + 3).unwrap_or(&rest[at..]);
        match escape {
            "%5B" | "%5b" => out.push('['),
            "%5D" | "%5d" => out.push(']'),
            _ => {
                out.push('%');
                rest = &rest[at + 1..];
                continue;
            }
        }
        rest = &rest[at + 3..];
    }
    out.push_str(rest);
    out
}

/// Resolves a JSON:API link value to a relative path
///
/// A link may be a plain string, an object with an `href`, or (for links that
/// point at a related singleton) an object whose `data` is an inline array of
/// linkage objects, in which case the first item's own path is used.
pub fn link_path(link: &Value, api_prefix: &str) -> Option<String> {
    match link {
        Value::String(href) => relative_path(href, api_prefix),
        Value::Object(map) => {
            if let Some(Value::String(href)) = map.get("href") {
                return relative_path(href, api_prefix);
            }
            match map.get("data") {
                Some(Value::Array(items)) => items.first().and_then(linkage_path),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Renders an `id` member as a string, accepting strings and numbers
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns the path of a `{type, id}` linkage object, if it is one
fn linkage_path(item: &Value) -> Option<String> {
    let type_name = item.get("type")?.as_str()?;
    let id = id_string(item.get("id")?)?;
    Some(stub_path(type_name, &id))
}

/// Returns the path of a relationship stub
///
/// Only objects whose `type` carries the compound separator past its first
/// characters count as stubs; plain metadata objects never match.
pub fn stub_target(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    let type_name = map.get("type")?.as_str()?;
    if !matches!(type_name.find(TYPE_SEPARATOR), Some(idx) if idx > 1) {
        return None;
    }
    let id = id_string(map.get("id")?)?;
    Some(stub_path(type_name, &id))
}

/// Recursively collects stub paths from a relationship value
///
/// Objects and arrays are walked depth-first; a stub is not descended into.
/// Paths are appended to `out` in discovery order, skipping duplicates.
pub fn collect_stub_paths(value: &Value, out: &mut Vec<String>, seen: &mut HashSet<String>) {
    if let Some(path) = stub_target(value) {
        if seen.insert(path.clone()) {
            out.push(path);
        }
        return;
    }

    match value {
        Value::Object(map) => {
            for child in map.values() {
                collect_stub_paths(child, out, seen);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_stub_paths(child, out, seen);
            }
        }
        _ => {}
    }
}
