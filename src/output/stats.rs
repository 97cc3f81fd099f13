//! Crawl statistics gathered from events
//!
//! This module provides the running tallies kept by the logger and the
//! extractor, and the end-of-run printout.

use crate::output::traits::CrawlSummary;
use std::collections::BTreeMap;

/// Tally of what the crawl loaded and where it failed
#[derive(Debug, Clone, Default)]
pub struct CrawlDigest {
    /// Loaded single resources per entity type
    pub loaded: BTreeMap<String, u64>,

    /// Collections (and collection pages) indexed
    pub collections: u64,

    /// Failed paths with their rendered reason, in failure order
    pub errors: Vec<(String, String)>,
}

impl CrawlDigest {
    pub fn record_loaded(&mut self, entity_type: &str) {
        *self.loaded.entry(entity_type.to_string()).or_insert(0) += 1;
    }

    pub fn record_error(&mut self, path: &str, reason: impl ToString) {
        self.errors.push((path.to_string(), reason.to_string()));
    }

    pub fn total_loaded(&self) -> u64 {
        self.loaded.values().sum()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Files written by the extractor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractorStats {
    pub resources_written: u64,
    pub slugs_written: u64,
    pub indexes_written: u64,
    /// Writes that failed; the crawl carries on regardless
    pub failures: u64,
}

impl ExtractorStats {
    pub fn total_written(&self) -> u64 {
        self.resources_written + self.slugs_written + self.indexes_written
    }
}

/// Prints a crawl summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    let report = &summary.report;
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!("  Fetches issued: {}", report.fetches);
    println!("  Related links: {}", report.related);
    println!("  Paths visited: {}", report.visited);
    println!("  Paths errored: {}", report.errored);
    if report.pending > 0 {
        println!("  Paths abandoned: {}", report.pending);
    }
    println!("  Duration: {}s", report.duration_seconds());
    println!();

    if !summary.digest.loaded.is_empty() {
        println!("Resources by Entity:");
        let mut counts: Vec<_> = summary.digest.loaded.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (entity, count) in counts {
            println!("  {}: {}", entity, count);
        }
        println!("  Collections indexed: {}", summary.digest.collections);
        println!();
    }

    if !summary.digest.errors.is_empty() {
        println!("Errors ({}):", summary.digest.error_count());
        for (path, reason) in &summary.digest.errors {
            println!("  {} - {}", path, reason);
        }
        println!();
    }

    let files = &summary.files;
    println!(
        "Files: {} resources, {} slugs, {} indexes ({} failed writes)",
        files.resources_written, files.slugs_written, files.indexes_written, files.failures
    );

    println!(
        "Success Rate: {:.1}% ({} / {} paths)",
        summary.success_rate(),
        report.visited,
        report.visited + report.errored
    );
}
