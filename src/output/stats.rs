//! Run reports
//!
//! Counters accumulated by the orchestrators and their console rendering.

use crate::model::SourceId;

/// Outcome counters of one batch scrape run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Records persisted successfully
    pub processed: usize,

    /// Links in the worklist
    pub total: usize,

    /// Pages that yielded no usable data
    pub empty: usize,

    /// Extraction errors, timeouts and panicked workers
    pub failed: usize,

    /// Records the registry refused to store
    pub save_failed: usize,

    /// Records stored whose link could not be flagged scraped afterwards
    pub unmarked: usize,
}

impl BatchReport {
    pub fn completion_ratio(&self) -> Option<f64> {
        ratio(self.processed, self.total)
    }
}

/// Summary of one source's sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub source: SourceId,

    /// Unique links found in the catalog
    pub discovered: usize,

    /// Links registered by this run
    pub new_links: usize,

    /// Detail scraping counters; None for discovery-only sources
    pub batch: Option<BatchReport>,
}

/// Summary of one stale-link reprocessing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReprocessReport {
    /// Records updated and flagged fresh
    pub processed: usize,

    pub failed: usize,

    /// Stale links handed out by the registry
    pub total: usize,
}

impl ReprocessReport {
    pub fn completion_ratio(&self) -> Option<f64> {
        ratio(self.processed, self.total)
    }
}

/// `part / total`, or None when there is nothing to divide by
pub fn ratio(part: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(part as f64 / total as f64)
    }
}

/// Renders a completion ratio as a percentage with two decimals
pub fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(ratio) => format!("{:.2}%", ratio * 100.0),
        None => "no items".to_string(),
    }
}

/// Prints a sync report to stdout
pub fn print_sync_report(label: &str, report: &SyncReport) {
    println!("=== {} ===", label);
    println!("  Links discovered: {}", report.discovered);
    println!("  New links registered: {}", report.new_links);

    match &report.batch {
        Some(batch) => {
            println!(
                "  Scraped: {}/{} ({})",
                batch.processed,
                batch.total,
                format_ratio(batch.completion_ratio())
            );
            if batch.empty > 0 {
                println!("  Empty pages: {}", batch.empty);
            }
            if batch.failed > 0 {
                println!("  Failed: {}", batch.failed);
            }
            if batch.save_failed > 0 {
                println!("  Save failures: {}", batch.save_failed);
            }
            if batch.unmarked > 0 {
                println!("  Saved but not marked scraped: {}", batch.unmarked);
            }
        }
        None => println!("  Detail scraping: not available for {}", report.source),
    }
    println!();
}

/// Prints a stale reprocessing report to stdout
pub fn print_reprocess_report(label: &str, report: &ReprocessReport) {
    println!("=== {} ===", label);
    println!("  Stale links: {}", report.total);
    println!("  Reprocessed: {}", report.processed);
    println!("  Failed: {}", report.failed);
    println!(
        "  Completion: {}",
        format_ratio(report.completion_ratio())
    );
    println!();
}
