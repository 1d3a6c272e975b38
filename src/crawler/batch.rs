//! Batch scrape orchestrator
//!
//! The worklist is split into fixed-size batches. Every item of a batch is
//! extracted on its own task and the batch is joined before its outcomes are
//! persisted, so batch N+1 never starts while batch N still has work in
//! flight. A failed, empty or panicked item only affects itself.
//!
//! Persistence is sequential per outcome: save the record, and only when the
//! registry confirms the save, flag the link scraped. Links that were not
//! flagged stay in the worklist of the next run.

use std::sync::Arc;

use futures::future::join_all;

use crate::crawler::extractor::spawn_extract;
use crate::crawler::Extractor;
use crate::model::{LinkTarget, ScrapeOutcome};
use crate::output::BatchReport;
use crate::registry::Registry;

/// Runs the worklist through an extractor and persists the results
pub struct BatchRunner {
    extractor: Arc<dyn Extractor>,
    registry: Arc<dyn Registry>,
    batch_size: usize,
}

impl BatchRunner {
    /// Creates a runner
    ///
    /// A batch size of zero is treated as one.
    pub fn new(extractor: Arc<dyn Extractor>, registry: Arc<dyn Registry>, batch_size: usize) -> Self {
        Self {
            extractor,
            registry,
            batch_size: batch_size.max(1),
        }
    }

    /// Scrapes and persists every link of `worklist`
    pub async fn run(&self, worklist: Vec<LinkTarget>) -> BatchReport {
        let mut report = BatchReport {
            total: worklist.len(),
            ..Default::default()
        };

        if worklist.is_empty() {
            tracing::info!("{}: nothing to scrape", self.extractor.source());
            return report;
        }

        let batches = worklist.len().div_ceil(self.batch_size);
        for (index, batch) in worklist.chunks(self.batch_size).enumerate() {
            tracing::info!(
                "{}: batch {}/{} ({} links)",
                self.extractor.source(),
                index + 1,
                batches,
                batch.len()
            );

            let outcomes = self.extract_batch(batch).await;
            for (target, outcome) in batch.iter().zip(outcomes) {
                self.persist(target, outcome, &mut report).await;
            }
        }

        tracing::info!(
            "{}: scraped {}/{} links",
            self.extractor.source(),
            report.processed,
            report.total
        );
        report
    }

    /// Extracts every item of one batch concurrently and waits for all of them
    async fn extract_batch(&self, batch: &[LinkTarget]) -> Vec<ScrapeOutcome> {
        let tasks: Vec<_> = batch
            .iter()
            .cloned()
            .map(|target| spawn_extract(Arc::clone(&self.extractor), target))
            .collect();

        join_all(tasks)
            .await
            .into_iter()
            .map(ScrapeOutcome::from_result)
            .collect()
    }

    async fn persist(&self, target: &LinkTarget, outcome: ScrapeOutcome, report: &mut BatchReport) {
        match outcome {
            ScrapeOutcome::Success(record) => {
                if !self.registry.save_record(&record).await {
                    tracing::error!("Failed to save record for {}, leaving it unscraped", target.url);
                    report.save_failed += 1;
                    return;
                }

                report.processed += 1;
                if !self.registry.mark_scraped(&target.id).await {
                    tracing::error!("Saved {} but could not mark it scraped", target.url);
                    report.unmarked += 1;
                }
            }
            ScrapeOutcome::Empty => {
                tracing::warn!("No data extracted from {}", target.url);
                report.empty += 1;
            }
            ScrapeOutcome::Failure(message) => {
                tracing::warn!("Failed to scrape {}: {}", target.url, message);
                report.failed += 1;
            }
        }
    }
}
