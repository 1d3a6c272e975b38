//! Stale-link reprocessing
//!
//! Links the registry flags as stale already have a persisted record. Each one
//! is scraped again with the extractor of its source and the record is updated
//! in place; only images that are not stored yet get inserted. Items are
//! handled one at a time, in the order the registry returned them.

use std::sync::Arc;

use crate::crawler::extractor::spawn_extract;
use crate::crawler::ExtractorSet;
use crate::model::{LinkTarget, StaleLink};
use crate::output::ReprocessReport;
use crate::registry::Registry;
use crate::Result;

/// Why a stale item could not be reprocessed
#[derive(Debug, Clone, PartialEq, Eq)]
enum ItemFailure {
    MissingField(&'static str),
    NoExtractor(String),
    Extraction(String),
    Empty,
    NoRecord,
    UpdateFailed,
    MarkFreshFailed,
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing {}", field),
            Self::NoExtractor(tag) => write!(f, "no extractor for source '{}'", tag),
            Self::Extraction(message) => write!(f, "extraction failed: {}", message),
            Self::Empty => write!(f, "no data extracted"),
            Self::NoRecord => write!(f, "no persisted record to update"),
            Self::UpdateFailed => write!(f, "record update failed"),
            Self::MarkFreshFailed => write!(f, "record updated but stale flag not cleared"),
        }
    }
}

/// Re-scrapes stale links and updates their records in place
pub struct StaleReprocessor {
    extractors: ExtractorSet,
    registry: Arc<dyn Registry>,
}

impl StaleReprocessor {
    pub fn new(extractors: ExtractorSet, registry: Arc<dyn Registry>) -> Self {
        Self {
            extractors,
            registry,
        }
    }

    /// Fetches the stale set and reprocesses it
    ///
    /// # Errors
    ///
    /// Fails only when the stale set itself cannot be fetched; per-item
    /// problems are counted in the report.
    pub async fn run(&self) -> Result<ReprocessReport> {
        let stale = self.registry.stale_links().await?;
        Ok(self.reprocess(stale).await)
    }

    /// Reprocesses `stale` sequentially
    pub async fn reprocess(&self, stale: Vec<StaleLink>) -> ReprocessReport {
        let mut report = ReprocessReport {
            total: stale.len(),
            ..Default::default()
        };

        for (index, item) in stale.iter().enumerate() {
            let label = item.link_id.as_deref().unwrap_or("?");
            match self.reprocess_one(item).await {
                Ok(()) => {
                    report.processed += 1;
                    tracing::info!(
                        "Reprocessed stale link {} ({}/{})",
                        label,
                        index + 1,
                        report.total
                    );
                }
                Err(failure) => {
                    report.failed += 1;
                    tracing::warn!("Stale link {} failed: {}", label, failure);
                }
            }
        }

        tracing::info!(
            "Stale reprocessing finished: {} processed, {} failed, {} total",
            report.processed,
            report.failed,
            report.total
        );
        report
    }

    async fn reprocess_one(&self, item: &StaleLink) -> std::result::Result<(), ItemFailure> {
        let url = item
            .url
            .as_deref()
            .ok_or(ItemFailure::MissingField("url"))?;
        let link_id = item
            .link_id
            .as_deref()
            .ok_or(ItemFailure::MissingField("link id"))?;

        let extractor = self
            .extractors
            .for_tag(&item.source)
            .ok_or_else(|| ItemFailure::NoExtractor(item.source.clone()))?;

        tracing::debug!("Re-scraping {} ({})", url, item.source);
        let target = LinkTarget::new(link_id, url);
        let record = spawn_extract(extractor, target)
            .await
            .map_err(|e| ItemFailure::Extraction(e.to_string()))?
            .ok_or(ItemFailure::Empty)?;

        let record_id = item.record_id.as_deref().ok_or(ItemFailure::NoRecord)?;

        if !self
            .registry
            .update_record(record_id, &record, &item.image_urls)
            .await
        {
            return Err(ItemFailure::UpdateFailed);
        }

        if !self.registry.mark_fresh(link_id).await {
            return Err(ItemFailure::MarkFreshFailed);
        }

        Ok(())
    }
}
