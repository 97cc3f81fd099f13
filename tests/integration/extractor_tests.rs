//! End-to-end runs that write resources to disk

use crate::fixtures::*;
use jsonapi_spider::config::{ApiConfig, Config, CrawlConfig, OutputConfig, TransformConfig};
use jsonapi_spider::run_crawl;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;
use wiremock::MockServer;

fn config(server: &MockServer, location: &Path, depth: Option<u32>) -> Config {
    Config {
        api: ApiConfig::new(base_url(server)),
        crawl: CrawlConfig {
            depth,
            roots: vec!["/node/article".to_string()],
            kinds: vec![],
        },
        output: OutputConfig {
            location: location.to_path_buf(),
            wipe: false,
            clean: true,
        },
        transform: TransformConfig::default(),
    }
}

fn read(file: impl AsRef<Path>) -> Value {
    let text = std::fs::read_to_string(file.as_ref())
        .unwrap_or_else(|e| panic!("{}: {}", file.as_ref().display(), e));
    serde_json::from_str(&text).unwrap()
}

async fn mount_site(server: &MockServer) {
    let items = vec![
        article("a-1", 1, Some("/blog/first%20post"), &["t-1"]),
        article("a-2", 2, None, &[]),
    ];
    mount_json(server, "/node/article", collection(server, "/node/article", items, None), 1).await;
    mount_json(server, "/taxonomy_term/tags/t-1", single(term("t-1", 10, "Rust")), 1).await;
}

#[tokio::test]
async fn test_run_crawl_writes_resources_and_slugs() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().unwrap();

    let summary = run_crawl(&config(&server, dir.path(), Some(2))).await.unwrap();

    assert_eq!(summary.report.fetches, 2);
    assert_eq!(summary.digest.loaded["node"], 2);
    assert_eq!(summary.digest.loaded["taxonomy_term"], 1);
    assert_eq!(summary.files.resources_written, 3);
    assert_eq!(summary.files.slugs_written, 3);
    assert_eq!(summary.files.indexes_written, 1);
    assert_eq!(summary.files.failures, 0);

    // Alias and fallback copies carry identical content
    let canonical = read(dir.path().join("_resources/node/article/a-1.json"));
    let alias = read(dir.path().join("_slugs/blog/first_post.json"));
    let fallback = read(dir.path().join("_slugs/node/1.json"));
    assert_eq!(canonical, alias);
    assert_eq!(canonical, fallback);

    assert_eq!(canonical["id"], "1");
    assert_eq!(canonical["guid"], "a-1");
    assert_eq!(canonical["paths"], serde_json::json!(["/blog/first post", "/node/1"]));
    assert_eq!(canonical["fields"]["title"], "Article 1");
    assert!(canonical["fields"].get("status").is_none());

    let tag = read(dir.path().join("_resources/taxonomy_term/tags/t-1.json"));
    assert_eq!(tag["fields"]["name"], "Rust");
    assert_eq!(tag["paths"], serde_json::json!([]));
    assert!(!dir.path().join("_slugs/taxonomy_term").exists());

    let index = read(dir.path().join("_indexes/node/article.json"));
    assert_eq!(
        index["items"],
        serde_json::json!(["/node/article/a-1", "/node/article/a-2"])
    );
    assert!(index["next"].is_null());
}

#[tokio::test]
async fn test_run_crawl_raw_output_with_wipe() {
    let server = MockServer::start().await;
    let items = vec![article("a-9", 9, None, &[])];
    mount_json(&server, "/node/article", collection(&server, "/node/article", items, None), 1).await;

    let dir = TempDir::new().unwrap();
    let location = dir.path().join("dist");
    std::fs::create_dir_all(location.join("_resources/stale")).unwrap();

    let mut config = config(&server, &location, Some(1));
    config.output.wipe = true;
    config.output.clean = false;
    let summary = run_crawl(&config).await.unwrap();

    assert_eq!(summary.files.resources_written, 1);
    assert!(!location.join("_resources/stale").exists());

    let raw = read(location.join("_resources/node/article/a-9.json"));
    assert_eq!(raw["type"], "node--article");
    assert_eq!(raw["attributes"]["drupal_internal__nid"], 9);
}

#[tokio::test]
async fn test_run_crawl_reports_errors_in_digest() {
    let server = MockServer::start().await;
    let items = vec![article("a-1", 1, None, &["missing"])];
    mount_json(&server, "/node/article", collection(&server, "/node/article", items, None), 1).await;

    let dir = TempDir::new().unwrap();
    let summary = run_crawl(&config(&server, dir.path(), None)).await.unwrap();

    assert_eq!(summary.report.errored, 1);
    assert_eq!(summary.digest.error_count(), 1);
    assert_eq!(summary.digest.errors[0].0, "/taxonomy_term/tags/missing");
    assert!(summary.success_rate() < 100.0);
}
