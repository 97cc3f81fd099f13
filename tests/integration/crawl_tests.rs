//! Crawl lifecycle tests against a mock JSON:API backend

use crate::fixtures::*;
use jsonapi_spider::config::ApiConfig;
use jsonapi_spider::{
    ConfigError, Coordinator, CrawlEvent, CrawlFailure, Depth, EventKind, PathState, SpiderError,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn coordinator(server: &MockServer) -> Coordinator {
    Coordinator::new(ApiConfig::new(base_url(server))).unwrap()
}

/// `/node/article` holds two articles; only the first is tagged
async fn mount_tagged_articles(server: &MockServer, term_fetches: u64) {
    let items = vec![
        article("a-1", 1, Some("/blog/first"), &["t-1"]),
        article("a-2", 2, None, &[]),
    ];
    mount_json(server, "/node/article", collection(server, "/node/article", items, None), 1).await;
    mount_json(
        server,
        "/taxonomy_term/tags/t-1",
        single(term("t-1", 10, "Rust")),
        term_fetches,
    )
    .await;
}

#[tokio::test]
async fn test_articles_and_tags_at_depth_two() {
    let server = MockServer::start().await;
    mount_tagged_articles(&server, 1).await;

    let mut spider = coordinator(&server);
    let log = EventLog::attach(&mut spider);

    assert!(spider.crawl("/node/article", Depth::limited(2)));
    let report = spider.run().await.unwrap();

    assert_eq!(report.fetches, 2);
    assert_eq!(report.errored, 0);
    // Only `field_tags` matches; `uid` and the term's `parent` are not followed
    assert_eq!(report.related, 1);
    assert_eq!(log.count(EventKind::ResourceLoaded), 3);
    assert_eq!(log.count(EventKind::CollectionIndex), 1);
    assert_eq!(log.count(EventKind::CrawlComplete), 1);
    assert_eq!(log.names().last(), Some(&"crawl-complete"));

    assert_eq!(
        log.paths(EventKind::ResourceLoaded),
        vec![
            "/node/article/a-1",
            "/node/article/a-2",
            "/taxonomy_term/tags/t-1"
        ]
    );

    let registry = spider.registry();
    assert_eq!(registry.state("/node/article"), Some(PathState::Visited));
    assert_eq!(registry.state("/taxonomy_term/tags/t-1"), Some(PathState::Visited));
    assert_eq!(registry.pending_count(), 0);
    assert!(registry.get("/user/user/author-1").is_none());
}

#[tokio::test]
async fn test_depth_one_follows_no_relationships() {
    let server = MockServer::start().await;
    mount_tagged_articles(&server, 0).await;

    let mut spider = coordinator(&server);
    let log = EventLog::attach(&mut spider);

    spider.crawl("/node/article", Depth::limited(1));
    let report = spider.run().await.unwrap();

    assert_eq!(report.fetches, 1);
    // The tag link is still discovered, just not followed
    assert_eq!(report.related, 1);
    assert_eq!(log.count(EventKind::ResourceLoaded), 2);
    assert_eq!(log.count(EventKind::CrawlStarted), 1);
}

#[tokio::test]
async fn test_depth_zero_is_clamped_to_one() {
    let server = MockServer::start().await;
    mount_tagged_articles(&server, 0).await;

    let mut spider = coordinator(&server);
    let log = EventLog::attach(&mut spider);

    spider.crawl("/node/article", Depth::Limited(0));
    spider.run().await.unwrap();

    let depths: Vec<Depth> = log
        .events()
        .iter()
        .filter_map(|e| match e {
            CrawlEvent::CrawlDepthComplete { depth, .. } => Some(*depth),
            _ => None,
        })
        .collect();
    assert_eq!(depths, vec![Depth::Limited(1)]);
}

#[tokio::test]
async fn test_pagination_does_not_consume_depth() {
    let server = MockServer::start().await;
    let page2 = "/node/article?page%5Boffset%5D=1";
    let page3 = "/node/article?page%5Boffset%5D=2";

    mount_page(
        &server,
        "/node/article",
        None,
        collection(&server, "/node/article", vec![article("a-1", 1, None, &[])], Some(page2)),
    )
    .await;
    mount_page(
        &server,
        "/node/article",
        Some("1"),
        collection(&server, page2, vec![article("a-2", 2, None, &[])], Some(page3)),
    )
    .await;
    mount_page(
        &server,
        "/node/article",
        Some("2"),
        collection(&server, page3, vec![article("a-3", 3, None, &[])], None),
    )
    .await;

    let mut spider = coordinator(&server);
    let log = EventLog::attach(&mut spider);

    spider.crawl("/node/article", Depth::limited(1));
    let report = spider.run().await.unwrap();

    assert_eq!(report.fetches, 3);
    assert_eq!(log.count(EventKind::CollectionIndex), 3);
    assert_eq!(log.count(EventKind::ResourceLoaded), 3);
    assert_eq!(
        log.paths(EventKind::CrawlStarted),
        vec![
            "/node/article",
            "/node/article?page[offset]=1",
            "/node/article?page[offset]=2"
        ]
    );
}

#[tokio::test]
async fn test_pagination_keeps_encoded_filter_values() {
    let server = MockServer::start().await;
    let first = "/node/article?filter%5Btitle%5D=Tom%20%26%20Jerry";
    let second = "/node/article?filter%5Btitle%5D=Tom%20%26%20Jerry&page%5Boffset%5D=1";

    Mock::given(method("GET"))
        .and(path("/jsonapi/node/article"))
        .and(query_param("filter[title]", "Tom & Jerry"))
        .and(PageOffset(None))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection(
            &server,
            first,
            vec![article("a-1", 1, None, &[])],
            Some(second),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jsonapi/node/article"))
        .and(query_param("filter[title]", "Tom & Jerry"))
        .and(PageOffset(Some("1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection(
            &server,
            second,
            vec![article("a-2", 2, None, &[])],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut spider = coordinator(&server);
    let log = EventLog::attach(&mut spider);

    spider.crawl("/node/article?filter[title]=Tom%20%26%20Jerry", Depth::limited(1));
    let report = spider.run().await.unwrap();

    assert_eq!(report.errored, 0);
    assert_eq!(report.fetches, 2);
    assert_eq!(log.count(EventKind::ResourceLoaded), 2);
    assert_eq!(
        log.paths(EventKind::CrawlStarted)[1],
        "/node/article?filter[title]=Tom%20%26%20Jerry&page[offset]=1"
    );
}

#[tokio::test]
async fn test_diamond_and_cycle_fetch_each_path_once() {
    let server = MockServer::start().await;

    // a -> {b, c}; b -> d; c -> d; d -> a
    mount_json(&server, "/node/article/a", single(related_article("a", 1, &["b", "c"])), 1).await;
    mount_json(&server, "/node/article/b", single(related_article("b", 2, &["d"])), 1).await;
    mount_json(&server, "/node/article/c", single(related_article("c", 3, &["d"])), 1).await;
    mount_json(&server, "/node/article/d", single(related_article("d", 4, &["a"])), 1).await;

    let mut spider = coordinator(&server);
    let log = EventLog::attach(&mut spider);

    spider.crawl("/node/article/a", Depth::Unbounded);
    let report = spider.run().await.unwrap();

    assert_eq!(report.fetches, 4);
    assert_eq!(report.visited, 4);
    assert_eq!(log.count(EventKind::ResourceLoaded), 4);
    assert_eq!(log.count(EventKind::CrawlComplete), 1);
}

#[tokio::test]
async fn test_missing_relationship_reports_error_and_completes() {
    let server = MockServer::start().await;
    let items = vec![article("a-1", 1, None, &["gone"])];
    mount_json(&server, "/node/article", collection(&server, "/node/article", items, None), 1).await;
    Mock::given(method("GET"))
        .and(path("/jsonapi/taxonomy_term/tags/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut spider = coordinator(&server);
    let log = EventLog::attach(&mut spider);

    spider.crawl("/node/article", Depth::Unbounded);
    let report = spider.run().await.unwrap();

    assert_eq!(report.errored, 1);
    assert_eq!(log.paths(EventKind::CrawlError), vec!["/taxonomy_term/tags/gone"]);
    assert_eq!(log.names().last(), Some(&"crawl-complete"));
    assert_eq!(log.count(EventKind::CrawlComplete), 1);

    let failure = spider.registry().failure("/taxonomy_term/tags/gone").unwrap();
    assert!(matches!(failure, CrawlFailure::Fetch(e) if e.status() == Some(404)));

    // Errored paths are never retried
    assert!(!spider.crawl("/taxonomy_term/tags/gone", Depth::Unbounded));
}

#[tokio::test]
async fn test_malformed_payload_is_reported() {
    let server = MockServer::start().await;
    mount_json(&server, "/node/weird", serde_json::json!({"data": "nope"}), 1).await;
    mount_json(
        &server,
        "/node/untyped",
        serde_json::json!({"data": [{"id": "x", "attributes": {}}]}),
        1,
    )
    .await;
    // One bad item rejects the whole page, valid siblings included
    mount_json(
        &server,
        "/node/mixed",
        serde_json::json!({"data": [article("a-1", 1, None, &[]), {"type": "plain", "id": "x"}]}),
        1,
    )
    .await;

    let mut spider = coordinator(&server);
    let log = EventLog::attach(&mut spider);

    spider.crawl("/node/weird", Depth::Unbounded);
    spider.crawl("/node/untyped", Depth::Unbounded);
    spider.crawl("/node/mixed", Depth::Unbounded);
    let report = spider.run().await.unwrap();

    assert_eq!(report.errored, 3);
    assert_eq!(report.visited, 0);
    assert!(spider.registry().get("/node/article/a-1").is_none());
    assert_eq!(log.count(EventKind::ResourceLoaded), 0);
    for event in log.events() {
        if let CrawlEvent::CrawlError { error, .. } = event {
            assert!(matches!(error, CrawlFailure::Malformed(_)));
        }
    }
    assert_eq!(log.count(EventKind::CrawlResourceComplete), 0);
}

#[tokio::test]
async fn test_terminate_on_error_halts_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jsonapi/node/missing"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_json(&server, "/node/page", collection(&server, "/node/page", vec![], None), 0).await;

    let mut config = ApiConfig::new(base_url(&server));
    config.terminate_on_error = true;
    config.max_concurrent = 1;
    let mut spider = Coordinator::new(config).unwrap();
    let log = EventLog::attach(&mut spider);

    spider.crawl("/node/missing", Depth::Unbounded);
    spider.crawl("/node/page", Depth::Unbounded);
    let result = spider.run().await;

    match result {
        Err(SpiderError::Terminated { path, reason }) => {
            assert_eq!(path, "/node/missing");
            assert!(matches!(reason, CrawlFailure::Fetch(e) if e.status() == Some(500)));
        }
        other => panic!("expected termination, got {:?}", other),
    }

    assert!(spider.is_halted());
    assert_eq!(log.count(EventKind::CrawlError), 1);
    assert_eq!(log.count(EventKind::CrawlComplete), 0);
    assert!(!spider.crawl("/node/other", Depth::Unbounded));
}

#[tokio::test]
async fn test_crawl_all_of_kind() {
    let server = MockServer::start().await;
    let types = serde_json::json!({"data": [
        {"type": "node_type--node_type", "id": "nt-1", "attributes": {"drupal_internal__type": "article"}},
        {"type": "node_type--node_type", "id": "nt-2", "attributes": {"drupal_internal__type": "page"}}
    ]});
    mount_json(&server, "/node_type/node_type", types, 1).await;
    mount_json(
        &server,
        "/node/article",
        collection(&server, "/node/article", vec![article("a-1", 1, None, &[])], None),
        1,
    )
    .await;
    mount_json(&server, "/node/page", collection(&server, "/node/page", vec![], None), 1).await;

    let mut spider = coordinator(&server);
    let log = EventLog::attach(&mut spider);

    let scheduled = spider.crawl_all_of_kind("node", Depth::limited(1)).await.unwrap();
    assert_eq!(scheduled, 2);

    spider.run().await.unwrap();
    assert_eq!(log.paths(EventKind::CrawlStarted), vec!["/node/article", "/node/page"]);
    assert_eq!(log.count(EventKind::CollectionIndex), 2);
    assert_eq!(log.count(EventKind::ResourceLoaded), 1);
}

#[tokio::test]
async fn test_crawl_all_of_kind_without_bundles() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/taxonomy_vocabulary/taxonomy_vocabulary",
        serde_json::json!({"data": []}),
        1,
    )
    .await;

    let mut spider = coordinator(&server);
    let log = EventLog::attach(&mut spider);

    let scheduled = spider
        .crawl_all_of_kind("taxonomy_vocabulary", Depth::Unbounded)
        .await
        .unwrap();
    assert_eq!(scheduled, 0);

    let errors: Vec<CrawlEvent> = log
        .events()
        .into_iter()
        .filter(|e| e.kind() == EventKind::CrawlError)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        CrawlEvent::CrawlError { error: CrawlFailure::Discovery(_), .. }
    ));

    spider.run().await.unwrap();
    assert_eq!(log.count(EventKind::CrawlComplete), 1);
}

#[tokio::test]
async fn test_events_arrive_in_lifecycle_order() {
    let server = MockServer::start().await;
    mount_json(&server, "/node/article/a", single(related_article("a", 1, &[])), 1).await;

    let mut spider = coordinator(&server);
    let log = EventLog::attach(&mut spider);

    spider.crawl("/node/article/a", Depth::Unbounded);
    spider.run().await.unwrap();

    assert_eq!(
        log.names(),
        vec![
            "crawl-started",
            "crawl-resource-complete",
            "resource-loaded",
            "crawl-depth-complete",
            "crawl-complete"
        ]
    );
}

/// Serves `/node/article/s-<n>` after a fixed delay, recording arrival times
#[derive(Clone)]
struct SlowArticles {
    delay: Duration,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl Respond for SlowArticles {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        let uuid = request.url.path().rsplit('/').next().unwrap_or_default();
        let nid = uuid.trim_start_matches("s-").parse().unwrap_or(0);
        ResponseTemplate::new(200)
            .set_body_json(single(related_article(uuid, nid, &[])))
            .set_delay(self.delay)
    }
}

#[tokio::test]
async fn test_concurrency_cap_bounds_requests_in_flight() {
    const LIMIT: usize = 2;
    let delay = Duration::from_millis(100);

    let server = MockServer::start().await;
    let backend = SlowArticles {
        delay,
        arrivals: Arc::new(Mutex::new(Vec::new())),
    };
    Mock::given(method("GET"))
        .and(path_regex(r"^/jsonapi/node/article/s-\d+$"))
        .respond_with(backend.clone())
        .expect(6)
        .mount(&server)
        .await;

    let mut config = ApiConfig::new(base_url(&server));
    config.max_concurrent = LIMIT as u32;
    let mut spider = Coordinator::new(config).unwrap();
    let log = EventLog::attach(&mut spider);

    for id in 0..6 {
        spider.crawl(&format!("/node/article/s-{}", id), Depth::Unbounded);
    }
    let report = spider.run().await.unwrap();

    assert_eq!(report.visited, 6);
    assert_eq!(log.count(EventKind::ResourceLoaded), 6);

    // A request can only arrive once an earlier one has been answered, so no
    // window shorter than the response delay holds more than LIMIT arrivals
    let arrivals = backend.arrivals.lock().unwrap().clone();
    let window = delay.mul_f32(0.8);
    for (i, arrived) in arrivals.iter().enumerate() {
        let overlapping = arrivals[..=i]
            .iter()
            .filter(|earlier| arrived.duration_since(**earlier) < window)
            .count();
        assert!(overlapping <= LIMIT, "{} requests overlapped", overlapping);
    }
}

#[test]
fn test_missing_base_url_fails_construction() {
    let result = Coordinator::new(ApiConfig::default());
    assert!(matches!(
        result,
        Err(SpiderError::Config(ConfigError::MissingBaseUrl))
    ));
}
