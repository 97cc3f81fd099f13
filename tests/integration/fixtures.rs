//! Shared payload builders and mock helpers

use jsonapi_spider::{Coordinator, CrawlEvent, EventKind, Subscription};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Path component every mock API lives under
pub const PREFIX: &str = "/jsonapi";

pub fn base_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), PREFIX)
}

/// A `node--article` resource object
pub fn article(uuid: &str, nid: u64, alias: Option<&str>, tags: &[&str]) -> Value {
    let mut attributes = json!({
        "drupal_internal__nid": nid,
        "title": format!("Article {}", nid),
        "status": true,
    });
    if let Some(alias) = alias {
        attributes["path"] = json!({"alias": alias, "pid": nid, "langcode": "en"});
    }

    let tags: Vec<Value> = tags
        .iter()
        .map(|id| json!({"type": "taxonomy_term--tags", "id": id}))
        .collect();

    json!({
        "type": "node--article",
        "id": uuid,
        "attributes": attributes,
        "relationships": {
            "field_tags": {"data": tags},
            "uid": {"data": {"type": "user--user", "id": "author-1"}}
        }
    })
}

/// A `node--article` linking to other articles through `field_related`
pub fn related_article(uuid: &str, nid: u64, related: &[&str]) -> Value {
    let related: Vec<Value> = related
        .iter()
        .map(|id| json!({"type": "node--article", "id": id}))
        .collect();
    json!({
        "type": "node--article",
        "id": uuid,
        "attributes": {"drupal_internal__nid": nid, "title": format!("Article {}", nid)},
        "relationships": {"field_related": {"data": related}}
    })
}

/// A `taxonomy_term--tags` resource object
pub fn term(uuid: &str, tid: u64, name: &str) -> Value {
    json!({
        "type": "taxonomy_term--tags",
        "id": uuid,
        "attributes": {"drupal_internal__tid": tid, "name": name, "weight": 0},
        "relationships": {
            "parent": {"data": [{"type": "taxonomy_term--tags", "id": "virtual"}]}
        }
    })
}

/// A collection document with absolute `self` and optional `next` links
pub fn collection(server: &MockServer, self_path: &str, items: Vec<Value>, next: Option<&str>) -> Value {
    let mut links = json!({"self": {"href": format!("{}{}", base_url(server), self_path)}});
    if let Some(next) = next {
        links["next"] = json!({"href": format!("{}{}", base_url(server), next)});
    }
    json!({"jsonapi": {"version": "1.0"}, "data": items, "links": links})
}

pub fn single(resource: Value) -> Value {
    json!({"jsonapi": {"version": "1.0"}, "data": resource})
}

/// Mounts a GET mock under the API prefix, expected exactly `times` times
pub async fn mount_json(server: &MockServer, api_path: &str, body: Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{}{}", PREFIX, api_path)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

/// Matches on the decoded `page[offset]` query parameter; `None` means absent
pub struct PageOffset(pub Option<&'static str>);

impl Match for PageOffset {
    fn matches(&self, request: &Request) -> bool {
        let offset = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "page[offset]")
            .map(|(_, value)| value.into_owned());
        offset.as_deref() == self.0
    }
}

/// Mounts one page of a paginated collection
pub async fn mount_page(
    server: &MockServer,
    api_path: &str,
    offset: Option<&'static str>,
    body: Value,
) {
    Mock::given(method("GET"))
        .and(path(format!("{}{}", PREFIX, api_path)))
        .and(PageOffset(offset))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

/// Records every event a coordinator emits
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<CrawlEvent>>>);

impl EventLog {
    pub fn attach(coordinator: &mut Coordinator) -> Self {
        let log = Self::default();
        let events = Arc::clone(&log.0);
        coordinator.subscribe(Subscription::All, move |event: &CrawlEvent| {
            events.lock().unwrap().push(event.clone());
        });
        log
    }

    pub fn events(&self) -> Vec<CrawlEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(CrawlEvent::name).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }

    /// Paths of events of `kind`, in emission order
    pub fn paths(&self, kind: EventKind) -> Vec<String> {
        self.events()
            .iter()
            .filter(|e| e.kind() == kind)
            .filter_map(|e| e.path().map(str::to_string))
            .collect()
    }
}
